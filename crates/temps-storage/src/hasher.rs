//! Id generation strategies

use async_trait::async_trait;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::traits::{IdHasher, Uploadable};
use crate::uploadable::read_uploadable;

const RANDOM_ID_BYTES: usize = 30;

/// Default strategy: 30 random bytes, hex encoded. Ignores the content.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomHasher;

#[async_trait]
impl IdHasher for RandomHasher {
    async fn hash(&self, _uploadable: &dyn Uploadable) -> Result<String> {
        let mut buf = [0u8; RANDOM_ID_BYTES];
        rand::thread_rng().fill_bytes(&mut buf);
        Ok(hex::encode(buf))
    }
}

/// Content-addressed ids: hex SHA-256 of the source bytes.
///
/// Reads the whole source, so uploading through this hasher costs one extra
/// read of the content.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

#[async_trait]
impl IdHasher for Sha256Hasher {
    async fn hash(&self, uploadable: &dyn Uploadable) -> Result<String> {
        let data = read_uploadable(uploadable).await?;
        Ok(hex::encode(Sha256::digest(&data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::verify_id;
    use crate::uploadable::UploadBytes;

    #[tokio::test]
    async fn test_random_hasher_format() {
        let source = UploadBytes::new("anything");
        let id = RandomHasher.hash(&source).await.unwrap();

        assert_eq!(id.len(), RANDOM_ID_BYTES * 2);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(verify_id(&id).is_ok());
    }

    #[tokio::test]
    async fn test_random_hasher_is_random() {
        let source = UploadBytes::new("same content");
        let a = RandomHasher.hash(&source).await.unwrap();
        let b = RandomHasher.hash(&source).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_sha256_hasher_is_content_addressed() {
        let id = Sha256Hasher.hash(&UploadBytes::new("hello")).await.unwrap();
        assert_eq!(
            id,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );

        let again = Sha256Hasher.hash(&UploadBytes::new("hello")).await.unwrap();
        let other = Sha256Hasher.hash(&UploadBytes::new("world")).await.unwrap();
        assert_eq!(id, again);
        assert_ne!(id, other);
        assert!(verify_id(&id).is_ok());
    }
}
