// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

// Original code found here:
// https://github.com/swsnr/systemd-journal-logger.rs/blob/v2.2.1/src/lib.rs#L76

use std::{ffi::OsStr, os::fd::AsFd as _};

/// Whether the current process is directly connected to the systemd journal.
///
/// Return `true` if the device and inode numbers of the [`std::io::stderr`]
/// file descriptor match the value of `$JOURNAL_STREAM` (see `systemd.exec(5)`).
/// Otherwise, return `false`.
pub fn connected_to_journal() -> bool {
    let stderr = rustix::fs::fstat(std::io::stderr().as_fd())
        .ok()
        .map(|stat| format!("{}:{}", stat.st_dev, stat.st_ino));
    stream_matches(
        stderr.as_deref(),
        std::env::var_os("JOURNAL_STREAM").as_deref(),
    )
}

fn stream_matches(stderr: Option<&str>, journal_stream: Option<&OsStr>) -> bool {
    match (stderr, journal_stream) {
        (Some(stderr), Some(journal_stream)) => journal_stream.to_string_lossy() == stderr,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    #[case(Some("8:1234"), Some("8:1234"), true)]
    #[case(Some("8:1234"), Some("8:4321"), false)]
    #[case(Some("8:1234"), None, false)]
    #[case(None, Some("8:1234"), false)]
    fn test_stream_matches(
        #[case] stderr: Option<&str>,
        #[case] journal_stream: Option<&str>,
        #[case] expected: bool,
    ) {
        assert_eq!(
            expected,
            stream_matches(stderr, journal_stream.map(OsStr::new))
        );
    }
}
