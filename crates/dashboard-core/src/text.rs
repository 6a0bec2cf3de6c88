//! Canonical text forms for headers and categorical cells.
//!
//! The published spreadsheet is typed by hand, so the same municipality or
//! service shows up as `"Belém"`, `"belem "` and `"BELEM"`. Everything here
//! collapses those spellings to one upper-case, accent-free form.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Remove diacritics by canonical decomposition, dropping combining marks.
///
/// ```
/// use dashboard_core::text::strip_accents;
///
/// assert_eq!(strip_accents("Belém"), "Belem");
/// assert_eq!(strip_accents("Situação"), "Situacao");
/// ```
pub fn strip_accents(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Canonical form of a categorical cell: accent-free, upper-case, trimmed.
///
/// Internal whitespace is kept as-is.
///
/// ```
/// use dashboard_core::text::normalize_text;
///
/// assert_eq!(normalize_text("  Link de Dados Rádio "), "LINK DE DADOS RADIO");
/// ```
pub fn normalize_text(text: &str) -> String {
    // Upper-casing first: a few code points only gain a combining mark when
    // upper-cased, and stripping afterwards keeps the transform idempotent.
    strip_accents(&text.to_uppercase()).trim().to_string()
}

/// Canonical column name: [`normalize_text`] with every space replaced by `_`.
///
/// ```
/// use dashboard_core::text::normalize_header;
///
/// assert_eq!(normalize_header(" Situação do Contrato"), "SITUACAO_DO_CONTRATO");
/// assert_eq!(normalize_header("VALOR_ATUAL"), "VALOR_ATUAL");
/// ```
pub fn normalize_header(header: &str) -> String {
    normalize_text(header).replace(' ', "_")
}

/// Normalize a header row, 1:1 and in order.
pub fn normalize_headers<S: AsRef<str>>(headers: &[S]) -> Vec<String> {
    headers.iter().map(|h| normalize_header(h.as_ref())).collect()
}
