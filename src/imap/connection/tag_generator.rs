use std::num::Wrapping;

/// Hands out the tags that pair each command with its completion.
#[derive(Debug)]
pub struct TagGenerator {
    last_tag: Wrapping<u16>,
}

impl TagGenerator {
    pub fn next(&mut self) -> String {
        self.last_tag += 1;
        format!("{:04x}", self.last_tag)
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self {
            last_tag: Wrapping(u16::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    fn test_tags_count_up_from_zero() {
        let mut tags = TagGenerator::default();

        assert_eq!("0000", tags.next());
        assert_eq!("0001", tags.next());
        assert_eq!("0002", tags.next());
    }

    #[rstest]
    fn test_tags_wrap_around() {
        let mut tags = TagGenerator {
            last_tag: Wrapping(0xfffe),
        };

        assert_eq!("ffff", tags.next());
        assert_eq!("0000", tags.next());
    }
}
