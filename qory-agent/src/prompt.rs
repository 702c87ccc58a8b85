//! User turn assembly

use std::fs;
use tracing::debug;

/// Build the user message from command line arguments.
///
/// Each argument contributes the content of the file it names or, when it
/// cannot be read as a file, its literal text. Invalid UTF-8 in file content
/// is replaced rather than rejected. Every piece is followed by a
/// newline.
pub fn build_user_prompt<S: AsRef<str>>(args: &[S]) -> String {
    let mut prompt = String::new();

    for arg in args {
        let arg = arg.as_ref();
        match fs::read(arg) {
            Ok(content) => prompt.push_str(&String::from_utf8_lossy(&content)),
            Err(e) => {
                debug!("Using {:?} as literal text ({})", arg, e);
                prompt.push_str(arg);
            }
        }
        prompt.push('\n');
    }

    prompt
}
