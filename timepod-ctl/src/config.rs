// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Optional `timepod.toml` settings.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use timepod_common::avr109::DEFAULT_PAGE_SIZE;
use timepod_common::{SysExAddress, PRODUCT_NAMES, USB_PRODUCT_ID, USB_VENDOR_ID};

pub const DEFAULT_CONFIG_FILE: &str = "timepod.toml";

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_firmware_url")]
    pub firmware_url: String,
    #[serde(default = "Config::default_product_names")]
    pub product_names: Vec<String>,
    #[serde(default = "Config::default_usb_vendor_id")]
    pub usb_vendor_id: u16,
    #[serde(default = "Config::default_usb_product_id")]
    pub usb_product_id: u16,
    #[serde(default = "Config::default_page_size")]
    pub page_size: usize,
    #[serde(default = "Config::default_poll_attempts")]
    pub poll_attempts: u32,
    #[serde(default = "Config::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "Config::default_bootloader_settle_ms")]
    pub bootloader_settle_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            firmware_url: Self::default_firmware_url(),
            product_names: Self::default_product_names(),
            usb_vendor_id: Self::default_usb_vendor_id(),
            usb_product_id: Self::default_usb_product_id(),
            page_size: Self::default_page_size(),
            poll_attempts: Self::default_poll_attempts(),
            poll_interval_ms: Self::default_poll_interval_ms(),
            bootloader_settle_ms: Self::default_bootloader_settle_ms(),
        }
    }
}

impl Config {
    fn default_firmware_url() -> String {
        "https://api.modernmidi.io/timepod.bin".to_string()
    }
    fn default_product_names() -> Vec<String> {
        PRODUCT_NAMES.iter().map(|s| s.to_string()).collect()
    }
    fn default_usb_vendor_id() -> u16 {
        USB_VENDOR_ID
    }
    fn default_usb_product_id() -> u16 {
        USB_PRODUCT_ID
    }
    fn default_page_size() -> usize {
        DEFAULT_PAGE_SIZE
    }
    fn default_poll_attempts() -> u32 {
        30
    }
    fn default_poll_interval_ms() -> u64 {
        500
    }
    fn default_bootloader_settle_ms() -> u64 {
        1500
    }

    /// Load settings from `path`, or defaults if the file does not exist.
    /// Zero or empty values fall back to their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let txt = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut cfg: Config =
            toml::from_str(&txt).with_context(|| format!("Invalid config {}", path.display()))?;

        if cfg.firmware_url.trim().is_empty() {
            cfg.firmware_url = Self::default_firmware_url();
        }
        cfg.product_names.retain(|n| !n.trim().is_empty());
        if cfg.product_names.is_empty() {
            cfg.product_names = Self::default_product_names();
        }
        if cfg.usb_vendor_id == 0 {
            cfg.usb_vendor_id = Self::default_usb_vendor_id();
        }
        if cfg.usb_product_id == 0 {
            cfg.usb_product_id = Self::default_usb_product_id();
        }
        if cfg.page_size == 0 {
            cfg.page_size = Self::default_page_size();
        }
        if cfg.page_size % 2 != 0 {
            bail!(
                "Invalid config {}: page_size must be even, got {}",
                path.display(),
                cfg.page_size
            );
        }
        if cfg.poll_attempts == 0 {
            cfg.poll_attempts = Self::default_poll_attempts();
        }
        if cfg.poll_interval_ms == 0 {
            cfg.poll_interval_ms = Self::default_poll_interval_ms();
        }
        if cfg.bootloader_settle_ms == 0 {
            cfg.bootloader_settle_ms = Self::default_bootloader_settle_ms();
        }
        Ok(cfg)
    }

    /// SysEx address derived from the configured USB ids.
    pub fn address(&self) -> SysExAddress {
        SysExAddress::from_usb_ids(self.usb_vendor_id, self.usb_product_id)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn bootloader_settle(&self) -> Duration {
        Duration::from_millis(self.bootloader_settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(&dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(cfg.firmware_url, "https://api.modernmidi.io/timepod.bin");
        assert_eq!(cfg.product_names, vec!["TP-001", "Modern MIDI"]);
        assert_eq!(cfg.page_size, 128);
        assert_eq!(cfg.poll_attempts, 30);
        assert_eq!(cfg.poll_interval(), Duration::from_millis(500));
        assert_eq!(cfg.bootloader_settle(), Duration::from_millis(1500));
        assert_eq!(cfg.address(), timepod_common::TIMEPOD_ADDRESS);
    }

    #[test]
    fn test_overrides() {
        let file = write_config(
            r#"
            firmware_url = "http://localhost:8000/fw.bin"
            page_size = 256
            poll_attempts = 5
            "#,
        );
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.firmware_url, "http://localhost:8000/fw.bin");
        assert_eq!(cfg.page_size, 256);
        assert_eq!(cfg.poll_attempts, 5);
        assert_eq!(cfg.poll_interval_ms, 500);
    }

    #[test]
    fn test_zero_and_empty_values_fall_back() {
        let file = write_config(
            r#"
            firmware_url = " "
            product_names = [""]
            usb_vendor_id = 0
            page_size = 0
            bootloader_settle_ms = 0
            "#,
        );
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.firmware_url, Config::default_firmware_url());
        assert_eq!(cfg.product_names.len(), 2);
        assert_eq!(cfg.usb_vendor_id, 0x04D8);
        assert_eq!(cfg.page_size, 128);
        assert_eq!(cfg.bootloader_settle_ms, 1500);
    }

    #[test]
    fn test_odd_page_size_is_an_error() {
        let file = write_config("page_size = 129");
        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let file = write_config("page_size = \"big\"");
        assert!(Config::load(file.path()).is_err());
    }
}
