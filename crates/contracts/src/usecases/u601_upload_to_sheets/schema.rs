/// Header contract of the target sheet: row 1, columns A..F, in this order.
///
/// `REFERENCIA` and `Referencia` are two distinct columns and are carried
/// through literally.
pub const REQUIRED_HEADERS: [&str; 6] = [
    "nombre cliente",
    "fecha",
    "REFERENCIA",
    "Referencia",
    "cantidad",
    "serie",
];

/// Columns that must hold a value for a row to be uploaded
pub const NON_EMPTY_COLUMNS: [&str; 3] = ["Referencia", "cantidad", "serie"];

/// A1 range of the header row
pub const HEADER_RANGE: &str = "A1:F1";
