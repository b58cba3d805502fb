//! Reversible obfuscation for secrets stored in settings files.
//!
//! This is not encryption in any cryptographic sense. It keeps passwords
//! from being readable at a glance in a config file.

use crate::error::{GoCdError, Result};

pub const DEFAULT_CIPHER: &str = "caesar";

pub trait Cipher: Send + Sync {
    fn name(&self) -> &'static str;
    fn encrypt(&self, plaintext: &str) -> String;
    fn decrypt(&self, ciphertext: &str) -> String;
}

/// ROT13 over ASCII letters, everything else passes through.
#[derive(Debug, Clone, Copy, Default)]
pub struct Caesar;

impl Caesar {
    fn rotate(text: &str) -> String {
        text.chars()
            .map(|c| match c {
                'a'..='z' => rotate_from(c, b'a'),
                'A'..='Z' => rotate_from(c, b'A'),
                _ => c,
            })
            .collect()
    }
}

fn rotate_from(c: char, base: u8) -> char {
    char::from((c as u8 - base + 13) % 26 + base)
}

impl Cipher for Caesar {
    fn name(&self) -> &'static str {
        DEFAULT_CIPHER
    }

    fn encrypt(&self, plaintext: &str) -> String {
        Self::rotate(plaintext)
    }

    fn decrypt(&self, ciphertext: &str) -> String {
        Self::rotate(ciphertext)
    }
}

/// Looks up a cipher by the name used in the `encryption_module` setting.
pub fn cipher_by_name(name: &str) -> Result<Box<dyn Cipher>> {
    match name.trim() {
        "caesar" | "rot13" | "gocd_cli.encryption.caesar" => Ok(Box::new(Caesar)),
        other => Err(GoCdError::Config(format!(
            "Unknown encryption module \"{other}\""
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caesar_rotates_letters_only() {
        assert_eq!(Caesar.encrypt("Hello, World! 123"), "Uryyb, Jbeyq! 123");
    }

    #[test]
    fn test_caesar_decrypt_reverses_encrypt() {
        let ciphertext = Caesar.encrypt("p4ssw0rd-Zebra");

        assert_ne!(ciphertext, "p4ssw0rd-Zebra");
        assert_eq!(Caesar.decrypt(&ciphertext), "p4ssw0rd-Zebra");
    }

    #[test]
    fn test_non_ascii_passes_through() {
        assert_eq!(Caesar.encrypt("Björn"), "Owöea");
    }

    #[test]
    fn test_cipher_by_name() {
        assert_eq!(cipher_by_name("rot13").unwrap().name(), "caesar");
        assert_eq!(
            cipher_by_name("gocd_cli.encryption.caesar").unwrap().name(),
            "caesar"
        );
        assert!(matches!(
            cipher_by_name("enigma"),
            Err(GoCdError::Config(_))
        ));
    }
}
