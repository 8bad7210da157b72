mod seq_num;
mod sequence_set;

pub use seq_num::SeqNum;
pub use sequence_set::SequenceSet;
pub use sequence_set::SequenceSetBuilder;
