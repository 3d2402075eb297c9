//! src/util/humanize.rs

const BINARY_UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
const DECIMAL_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Scale a byte count into the largest unit that keeps its magnitude >= 1.
///
/// Returns `(scaled_value, unit_name, unit_size)` where
/// `scaled_value * unit_size == n_bytes`. With `base2` the units are powers of
/// 1024 (`KiB`, `MiB`, ...), otherwise powers of 1000 (`KB`, `MB`, ...). The
/// unit index is the floor of the logarithm, or the nearest integer when
/// `round_up` is set. Units stop at tebibytes/terabytes.
///
/// ```
/// use time_block::util::humanize::mem2str;
///
/// let (value, unit, size) = mem2str(1536.0, true, false);
/// assert_eq!((value, unit, size), (1.5, "KiB", 1024.0));
/// ```
pub fn mem2str(n_bytes: f64, base2: bool, round_up: bool) -> (f64, &'static str, f64) {
    let (units, base) = if base2 {
        (&BINARY_UNITS, 1024.0_f64)
    } else {
        (&DECIMAL_UNITS, 1000.0_f64)
    };

    let unit_idx = if n_bytes == 0.0 || !n_bytes.is_finite() {
        0
    } else {
        let exponent = n_bytes.abs().log(base);
        let exponent = if round_up {
            exponent.round()
        } else {
            exponent.floor()
        };
        // Fractions of a byte stay in bytes.
        (exponent.max(0.0) as usize).min(units.len() - 1)
    };

    let unit_size = base.powi(unit_idx as i32);
    (n_bytes / unit_size, units[unit_idx], unit_size)
}

/// Binary-unit rendering used in notices, e.g. `1.5KiB`.
pub fn human_readable_delta(n_bytes: i64) -> String {
    let (value, unit, _) = mem2str(n_bytes as f64, true, false);
    format!("{value:.1}{unit}")
}
