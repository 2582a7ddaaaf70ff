mod file_dictionary;
pub mod ranges;
mod result;

pub use file_dictionary::FileDictionary;
pub use result::Result;
