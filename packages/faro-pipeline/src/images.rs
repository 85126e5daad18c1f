use std::{
	fs,
	path::{Component, Path, PathBuf},
};

use base64::{Engine, engine::general_purpose::STANDARD};

/// Reads an image by its response-relative path and encodes it for a vision
/// call. Paths that escape `root` are rejected; unreadable files are skipped.
pub fn encode_image_base64(root: &Path, relative: &str) -> Option<String> {
	let relative = relative.trim_start_matches('/');
	let candidate = PathBuf::from(relative);

	if candidate
		.components()
		.any(|component| !matches!(component, Component::Normal(_)))
	{
		tracing::warn!(path = relative, "Rejected image path outside the static root.");

		return None;
	}

	let full = root.join(candidate);

	match fs::read(&full) {
		Ok(bytes) => Some(STANDARD.encode(bytes)),
		Err(err) => {
			tracing::warn!(path = %full.display(), error = %err, "Failed to read candidate image.");

			None
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn traversal_components_are_rejected() {
		assert!(encode_image_base64(Path::new("."), "../etc/passwd").is_none());
		assert!(encode_image_base64(Path::new("."), "static/../../etc/passwd").is_none());
	}

	#[test]
	fn missing_files_are_skipped() {
		assert!(encode_image_base64(Path::new("."), "static/no_such_image.png").is_none());
	}

	#[test]
	fn existing_files_round_trip_through_base64() {
		let dir = std::env::temp_dir().join(format!("faro_images_test_{}", std::process::id()));

		fs::create_dir_all(&dir).expect("Failed to create temp dir.");

		let file = dir.join("tabla.png");

		fs::write(&file, b"not-really-a-png").expect("Failed to write test image.");

		let encoded = encode_image_base64(&dir, "tabla.png").expect("Image must encode.");

		assert_eq!(STANDARD.decode(encoded).expect("decode"), b"not-really-a-png");

		let _ = fs::remove_dir_all(&dir);
	}
}
