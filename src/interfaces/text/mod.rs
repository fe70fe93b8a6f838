mod certificate;
mod receipt;

pub use certificate::render_certificate;
pub use receipt::render_receipt;
