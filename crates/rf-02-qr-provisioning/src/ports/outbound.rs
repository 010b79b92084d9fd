//! Outbound Ports (Driven Ports)

use async_trait::async_trait;
use shared_types::{StoreError, UserId};

use crate::domain::QrOptions;
use crate::error::QrError;

/// QR encoder (Driven Port)
///
/// Black box: text in, image reference (data URL) out.
pub trait QrEncoder: Send + Sync {
    fn encode(&self, text: &str, options: &QrOptions) -> Result<String, QrError>;
}

/// Persists the generated image on the profile (Driven Port)
#[async_trait]
pub trait QrCodeStore: Send + Sync {
    /// Set `qr_code_url` on the profile. Last write wins.
    async fn save_qr_code_url(&self, id: &UserId, url: &str) -> Result<(), StoreError>;
}

/// Encoder that returns a fixed-format fake data URL.
#[cfg(test)]
pub struct MockQrEncoder {
    pub fail: std::sync::atomic::AtomicBool,
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockQrEncoder {
    pub fn new() -> Self {
        Self {
            fail: Default::default(),
            calls: Default::default(),
        }
    }
}

#[cfg(test)]
impl QrEncoder for MockQrEncoder {
    fn encode(&self, text: &str, _options: &QrOptions) -> Result<String, QrError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(QrError::Encoding("encoder disabled".into()));
        }
        Ok(format!("data:text/plain,{text}"))
    }
}

/// Records saved URLs. Can hold the write open until released.
#[cfg(test)]
pub struct MockQrCodeStore {
    pub saved: parking_lot::Mutex<Vec<(UserId, String)>>,
    pub fail: std::sync::atomic::AtomicBool,
    pub release: tokio::sync::Notify,
    pub hold: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MockQrCodeStore {
    pub fn new() -> Self {
        Self {
            saved: Default::default(),
            fail: Default::default(),
            release: tokio::sync::Notify::new(),
            hold: Default::default(),
        }
    }

    pub fn saved_count(&self) -> usize {
        self.saved.lock().len()
    }
}

#[cfg(test)]
#[async_trait]
impl QrCodeStore for MockQrCodeStore {
    async fn save_qr_code_url(&self, id: &UserId, url: &str) -> Result<(), StoreError> {
        if self.hold.load(std::sync::atomic::Ordering::SeqCst) {
            self.release.notified().await;
        }
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store disabled".into()));
        }
        self.saved.lock().push((*id, url.to_string()));
        Ok(())
    }
}
