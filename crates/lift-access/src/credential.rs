//! Visitor credential minting: opaque tokens, the URI a QR code
//! carries, and the rendered PNG.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};

use crate::error::AccessError;

/// Scheme and path every visitor credential URI starts with.
pub const CREDENTIAL_PREFIX: &str = "smartaccess://visitor/";

/// Generate an opaque visitor token (32 random bytes → base64url, no
/// padding, 43 chars).
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// The URI embedded in a credential's QR code.
pub fn credential_payload(token: &str) -> String {
    format!("{CREDENTIAL_PREFIX}{token}")
}

/// Extract the token from a scanned credential URI.
pub fn parse_credential_payload(uri: &str) -> Option<&str> {
    uri.strip_prefix(CREDENTIAL_PREFIX)
        .filter(|token| !token.is_empty())
}

/// Render `payload` as a QR code PNG.
///
/// Uses error correction level Q, which survives roughly a quarter of
/// the symbol being damaged or covered. The output depends only on the
/// payload and `module_size`.
pub fn generate_image(payload: &str, module_size: u32) -> Result<Vec<u8>, AccessError> {
    let code = QrCode::with_error_correction_level(payload, EcLevel::Q)
        .map_err(|e| AccessError::ImageEncoding(e.to_string()))?;

    let module_size = module_size.max(1);
    let raster = code
        .render::<Luma<u8>>()
        .module_dimensions(module_size, module_size)
        .build();

    let mut bytes = Vec::new();
    raster
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| AccessError::ImageEncoding(e.to_string()))?;
    Ok(bytes)
}

/// `data:` URI for embedding a rendered credential directly in markup.
pub fn image_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
