//! Small standalone codecs: Base64 text, JSON Web Tokens and image formats.

mod base64_text;
mod image_convert;
mod jwt;

pub use base64_text::{decode_base64, encode_base64};
pub use image_convert::{DEFAULT_IMAGE_QUALITY, ImageFormat, convert_image, converted_file_name};
pub use jwt::{
    DecodedToken, JwtAlgorithm, SignatureState, TokenInspection, decode_token, inspect_token,
    sign_token,
};
