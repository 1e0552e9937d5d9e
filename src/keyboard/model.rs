//! Keyboard make/model detection for the status line and reports

/// Returned when nothing better can be found
pub const UNKNOWN_MODEL: &str = "Unknown keyboard";

/// Best-effort name of the attached keyboard
pub fn detect() -> String {
    #[cfg(target_os = "linux")]
    {
        if let Some(name) = linux::from_sysfs() {
            return name;
        }
        if let Some(name) = linux::from_lsusb() {
            return name;
        }
    }
    UNKNOWN_MODEL.to_string()
}

/// Pull the product description out of `lsusb` output.
///
/// Lines look like `Bus 001 Device 003: ID 046d:c31c Logitech, Inc. Keyboard K120`;
/// everything after the vendor:product pair is returned.
pub fn parse_lsusb(output: &str) -> Option<String> {
    output
        .lines()
        .filter(|line| line.to_lowercase().contains("keyboard"))
        .find_map(|line| {
            let (_, after_id) = line.split_once("ID ")?;
            let (_, product) = after_id.split_once(' ')?;
            let product = product.trim();
            (!product.is_empty()).then(|| product.to_string())
        })
}

/// Whether an input device name looks like a keyboard
pub fn looks_like_keyboard(name: &str) -> bool {
    let lower = name.to_lowercase();
    (lower.contains("keyboard") || lower.contains("kbd")) && !lower.contains("virtual")
}

#[cfg(target_os = "linux")]
mod linux {
    use super::{looks_like_keyboard, parse_lsusb};
    use std::fs;
    use std::process::Command;

    pub(super) fn from_sysfs() -> Option<String> {
        let mut names: Vec<String> = fs::read_dir("/sys/class/input")
            .ok()?
            .flatten()
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("input"))
            .filter_map(|entry| fs::read_to_string(entry.path().join("name")).ok())
            .map(|name| name.trim().to_string())
            .filter(|name| looks_like_keyboard(name))
            .collect();
        names.sort();
        names.into_iter().next()
    }

    pub(super) fn from_lsusb() -> Option<String> {
        let output = Command::new("lsusb").output().ok()?;
        if !output.status.success() {
            return None;
        }
        parse_lsusb(&String::from_utf8_lossy(&output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lsusb_product_after_id() {
        let output = "\
Bus 001 Device 001: ID 1d6b:0002 Linux Foundation 2.0 root hub
Bus 001 Device 003: ID 046d:c31c Logitech, Inc. Keyboard K120
";
        assert_eq!(
            parse_lsusb(output),
            Some("Logitech, Inc. Keyboard K120".to_string())
        );
    }

    #[test]
    fn lsusb_without_keyboard() {
        let output = "Bus 001 Device 001: ID 1d6b:0002 Linux Foundation 2.0 root hub\n";
        assert_eq!(parse_lsusb(output), None);
    }

    #[test]
    fn keyboard_names() {
        assert!(looks_like_keyboard("AT Translated Set 2 keyboard"));
        assert!(looks_like_keyboard("Logitech USB Keyboard"));
        assert!(!looks_like_keyboard("Virtual core XTEST keyboard"));
        assert!(!looks_like_keyboard("Power Button"));
    }

    #[test]
    fn detect_always_returns_something() {
        assert!(!detect().is_empty());
    }
}
