use std::path::{Path, PathBuf};
use std::{env, fs, io};

/// Reads a whole text file.
///
/// Invalid UTF-8 sequences are replaced rather than rejected, so a corpus
/// with a few bad bytes still imports.
pub fn read_text<P: AsRef<Path>>(filename: P) -> io::Result<String> {
	let bytes = fs::read(filename)?;
	Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Builds a sibling path with a new extension.
///
/// Example:
/// `data/books.txt` + `"bin"` → `data/books.bin`
pub(crate) fn build_output_path<P: AsRef<Path>>(input_path: P, output_extension: &str) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./data/books.txt"` → `"books"`
/// - `"books.txt"` → `"books"`
pub(crate) fn get_filename<P: AsRef<Path>>(input_path: P) -> io::Result<String> {
	let stem = input_path
		.as_ref()
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	Ok(stem.to_string_lossy().to_string())
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub fn normalize_folder(input: &str) -> PathBuf {
	if input == "." || input == "./" {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		PathBuf::from(input)
	}
}

/// Lists the stems of all files with a given extension in a directory, sorted.
///
/// Example: a folder holding `books.txt` and `books.bin` lists `["books"]`
/// for the `"txt"` extension.
pub fn list_corpora<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut names = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(stem) = path.file_stem() {
				names.push(stem.to_string_lossy().to_string());
			}
		}
	}

	names.sort();
	Ok(names)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn output_path_replaces_extension() {
		let path = build_output_path("data/books.txt", "bin").unwrap();
		assert_eq!(path, PathBuf::from("data/books.bin"));
	}

	#[test]
	fn filename_is_the_stem() {
		assert_eq!(get_filename("./data/books.txt").unwrap(), "books");
	}

	#[test]
	fn lists_only_matching_extension() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("b.txt"), "b").unwrap();
		fs::write(dir.path().join("a.txt"), "a").unwrap();
		fs::write(dir.path().join("a.bin"), "a").unwrap();
		assert_eq!(list_corpora(dir.path(), "txt").unwrap(), vec!["a", "b"]);
	}

	#[test]
	fn lossy_read_keeps_valid_text() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("bad.txt");
		fs::write(&path, [b'o', b'k', 0xff, b'!']).unwrap();
		assert_eq!(read_text(&path).unwrap(), "ok\u{fffd}!");
	}
}
