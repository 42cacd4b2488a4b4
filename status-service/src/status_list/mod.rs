//! # Status List Engine
//!
//! In-memory status lists and the pipeline that turns them into published
//! payloads and back:
//!
//! ```text
//! bits -> pack + gzip -> [AES-256-GCM] -> hex | base64 | base64url
//! ```
//!
//! ## Bit state machines
//!
//! - revocation: `Active(0) -> Revoked(1)`, terminal
//! - suspension: `Active(0) <-> Suspended(1)`

pub mod cipher;
pub mod codec;

use chrono::Utc;
use std::collections::HashSet;
use tracing::debug;

use shared::constants::MAX_STATUS_LIST_LENGTH;
use shared::error::{StatusError, StatusResult};
use shared::types::{
    BitStatus, Encoding, IndexChange, PayloadMetadata, StatusAction, StatusList2021,
    StatusListPayload, StatusPurpose,
};

use cipher::SymmetricKey;
use codec::Bits;

/// A fixed-length status bitstring with an immutable purpose
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusList {
    purpose: StatusPurpose,
    bits: Bits,
}

impl StatusList {
    /// Allocate an all-zero list
    pub fn allocate(length: usize, purpose: StatusPurpose) -> StatusResult<Self> {
        Self::allocate_bounded(length, purpose, MAX_STATUS_LIST_LENGTH)
    }

    /// Allocate an all-zero list no longer than `max_length`
    pub fn allocate_bounded(
        length: usize,
        purpose: StatusPurpose,
        max_length: usize,
    ) -> StatusResult<Self> {
        check_length(length, max_length)?;
        Ok(Self {
            purpose,
            bits: Bits::repeat(false, length),
        })
    }

    /// Wrap existing bits
    pub fn from_bits(bits: Bits, purpose: StatusPurpose) -> StatusResult<Self> {
        check_length(bits.len(), MAX_STATUS_LIST_LENGTH)?;
        Ok(Self { purpose, bits })
    }

    pub fn purpose(&self) -> StatusPurpose {
        self.purpose
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn bits(&self) -> &Bits {
        &self.bits
    }

    /// Read one bit
    pub fn test_bit(&self, index: usize) -> StatusResult<bool> {
        self.bits
            .get(index)
            .map(|bit| *bit)
            .ok_or(StatusError::IndexOutOfRange {
                index,
                length: self.len(),
            })
    }

    pub fn status_of(&self, index: usize) -> StatusResult<BitStatus> {
        Ok(match (self.test_bit(index)?, self.purpose) {
            (false, _) => BitStatus::Active,
            (true, StatusPurpose::Revocation) => BitStatus::Revoked,
            (true, StatusPurpose::Suspension) => BitStatus::Suspended,
        })
    }

    /// Number of set bits
    pub fn set_count(&self) -> usize {
        self.bits.count_ones()
    }

    /// Apply `action` to every index, all or nothing.
    ///
    /// Duplicates are collapsed, keeping first-occurrence order; one
    /// [`IndexChange`] is reported per unique index.
    pub fn apply_batch(
        &mut self,
        indices: &[usize],
        action: StatusAction,
    ) -> StatusResult<Vec<IndexChange>> {
        if indices.is_empty() {
            return Err(StatusError::InvalidRequest("at least one index is required".into()));
        }

        if action.required_purpose() != self.purpose {
            return Err(StatusError::UnsupportedAction {
                action: action.to_string(),
                purpose: self.purpose.to_string(),
            });
        }

        let length = self.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= length) {
            return Err(StatusError::IndexOutOfRange { index, length });
        }

        let target = action.target_bit();
        let mut seen = HashSet::with_capacity(indices.len());
        let mut changes = Vec::with_capacity(indices.len());

        for &index in indices {
            if !seen.insert(index) {
                continue;
            }
            let changed = self.bits[index] != target;
            if changed {
                self.bits.set(index, target);
            }
            changes.push(IndexChange { index, changed });
        }

        debug!(
            action = %action,
            requested = indices.len(),
            changed = changes.iter().filter(|c| c.changed).count(),
            "Applied status batch"
        );

        Ok(changes)
    }

    /// Encode into a publishable payload, encrypting when a key is given
    pub fn seal(
        &self,
        encoding: Encoding,
        key: Option<&SymmetricKey>,
    ) -> StatusResult<StatusListPayload> {
        let compressed = codec::compress(&self.bits)?;
        seal_compressed(compressed, self.purpose, self.len(), encoding, key)
    }

    /// Decode a published payload
    pub fn open(payload: &StatusListPayload, key: Option<&SymmetricKey>) -> StatusResult<Self> {
        let compressed = open_compressed(payload, key)?;
        let bits = codec::decompress(&compressed)?;
        let bits = match payload.metadata.length {
            Some(length) => codec::truncate(bits, length)?,
            None => bits,
        };
        Self::from_bits(bits, purpose_of(payload))
    }
}

/// Build a payload from already compressed bits
pub fn seal_compressed(
    compressed: Vec<u8>,
    purpose: StatusPurpose,
    length: usize,
    encoding: Encoding,
    key: Option<&SymmetricKey>,
) -> StatusResult<StatusListPayload> {
    let (bytes, encrypted) = match key {
        Some(key) => (cipher::encrypt(&compressed, key)?, true),
        None => (compressed, false),
    };

    Ok(StatusListPayload {
        status_list: StatusList2021 {
            encoded_list: codec::to_transport(&bytes, encoding),
            list_type: purpose.list_type().to_string(),
            valid_from: Utc::now(),
        },
        metadata: PayloadMetadata {
            encoding,
            encrypted,
            length: Some(length),
        },
    })
}

/// Transport-decode and, if needed, decrypt a payload down to gzip bytes
pub fn open_compressed(
    payload: &StatusListPayload,
    key: Option<&SymmetricKey>,
) -> StatusResult<Vec<u8>> {
    let bytes =
        codec::from_transport(&payload.status_list.encoded_list, payload.metadata.encoding)?;

    match (payload.metadata.encrypted, key) {
        (true, Some(key)) => cipher::decrypt(&bytes, key),
        (true, None) => Err(StatusError::InvalidRequest(
            "a symmetric key is required to read an encrypted status list".into(),
        )),
        (false, Some(_)) => Err(StatusError::InvalidRequest(
            "a symmetric key was supplied for an unencrypted status list".into(),
        )),
        (false, None) => Ok(bytes),
    }
}

/// SHA-256 (hex) checksum of a payload's encoded list
pub fn payload_checksum(payload: &StatusListPayload) -> StatusResult<String> {
    codec::checksum(&payload.status_list.encoded_list, payload.metadata.encoding)
}

fn purpose_of(payload: &StatusListPayload) -> StatusPurpose {
    if payload.status_list.list_type == StatusPurpose::Suspension.list_type() {
        StatusPurpose::Suspension
    } else {
        StatusPurpose::Revocation
    }
}

/// Reject zero lengths and lengths above `max_length`
pub(crate) fn check_length(length: usize, max_length: usize) -> StatusResult<()> {
    if length == 0 {
        return Err(StatusError::InvalidLength {
            length,
            reason: "a status list needs at least one entry".into(),
        });
    }
    if length > max_length {
        return Err(StatusError::InvalidLength {
            length,
            reason: format!("exceeds the maximum of {max_length} entries"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::Rng;

    #[test]
    fn test_allocate_eight() {
        let list = StatusList::allocate(8, StatusPurpose::Revocation).unwrap();
        assert_eq!(list.len(), 8);
        assert_eq!(list.set_count(), 0);
        for i in 0..8 {
            assert!(!list.test_bit(i).unwrap());
        }
        assert!(matches!(
            list.test_bit(8),
            Err(StatusError::IndexOutOfRange { index: 8, length: 8 })
        ));
    }

    #[test]
    fn test_allocate_invalid_length() {
        assert!(matches!(
            StatusList::allocate(0, StatusPurpose::Suspension),
            Err(StatusError::InvalidLength { length: 0, .. })
        ));
        assert!(StatusList::allocate_bounded(17, StatusPurpose::Suspension, 16).is_err());
    }

    #[test]
    fn test_revocation_is_monotonic() {
        let mut rng = rand::thread_rng();
        let mut list = StatusList::allocate(512, StatusPurpose::Revocation).unwrap();
        let mut previous = list.clone();

        for _ in 0..20 {
            let batch: Vec<usize> = (0..rng.gen_range(1..16))
                .map(|_| rng.gen_range(0..512))
                .collect();
            list.apply_batch(&batch, StatusAction::Revoke).unwrap();

            for i in 0..512 {
                if previous.test_bit(i).unwrap() {
                    assert!(list.test_bit(i).unwrap(), "bit {i} went 1 -> 0");
                }
            }
            previous = list.clone();
        }

        assert!(matches!(
            list.apply_batch(&[0], StatusAction::Reinstate),
            Err(StatusError::UnsupportedAction { .. })
        ));
    }

    #[test]
    fn test_suspension_idempotence() {
        let mut list = StatusList::allocate(64, StatusPurpose::Suspension).unwrap();

        let first = list.apply_batch(&[3, 5], StatusAction::Suspend).unwrap();
        assert!(first.iter().all(|c| c.changed));

        let snapshot = list.clone();
        let second = list.apply_batch(&[3, 5], StatusAction::Suspend).unwrap();
        assert!(second.iter().all(|c| !c.changed));
        assert_eq!(list, snapshot);

        let reinstated = list.apply_batch(&[5, 6], StatusAction::Reinstate).unwrap();
        assert_eq!(
            reinstated,
            vec![
                IndexChange { index: 5, changed: true },
                IndexChange { index: 6, changed: false },
            ]
        );
        assert_eq!(list.status_of(3).unwrap(), BitStatus::Suspended);
        assert_eq!(list.status_of(5).unwrap(), BitStatus::Active);
    }

    #[test]
    fn test_batch_is_atomic() {
        let mut list = StatusList::allocate(10, StatusPurpose::Suspension).unwrap();
        let err = list.apply_batch(&[1, 2, 10], StatusAction::Suspend).unwrap_err();
        assert!(matches!(err, StatusError::IndexOutOfRange { index: 10, length: 10 }));
        assert_eq!(list.set_count(), 0);

        let err = list.apply_batch(&[1], StatusAction::Revoke).unwrap_err();
        assert!(matches!(err, StatusError::UnsupportedAction { .. }));
        assert_eq!(list.set_count(), 0);
    }

    #[test]
    fn test_duplicates_collapse_in_order() {
        let mut list = StatusList::allocate(16, StatusPurpose::Revocation).unwrap();
        let mut indices = vec![7, 2, 7, 9, 2];
        let changes = list.apply_batch(&indices, StatusAction::Revoke).unwrap();
        assert_eq!(changes.iter().map(|c| c.index).collect::<Vec<_>>(), vec![7, 2, 9]);
        assert_eq!(list.set_count(), 3);

        indices.shuffle(&mut rand::thread_rng());
        assert!(list
            .apply_batch(&indices, StatusAction::Revoke)
            .unwrap()
            .iter()
            .all(|c| !c.changed));
    }

    #[test]
    fn test_empty_batch() {
        let mut list = StatusList::allocate(4, StatusPurpose::Revocation).unwrap();
        assert!(matches!(
            list.apply_batch(&[], StatusAction::Revoke),
            Err(StatusError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_seal_and_open_encrypted() {
        let key = SymmetricKey::generate();
        let mut list = StatusList::allocate(1001, StatusPurpose::Suspension).unwrap();
        list.apply_batch(&[0, 500, 1000], StatusAction::Suspend).unwrap();

        let payload = list.seal(Encoding::Hex, Some(&key)).unwrap();
        assert!(payload.metadata.encrypted);
        assert_eq!(payload.metadata.length, Some(1001));
        assert_eq!(payload.status_list.list_type, "SuspensionList2021");

        assert_eq!(StatusList::open(&payload, Some(&key)).unwrap(), list);
        assert!(matches!(
            StatusList::open(&payload, None),
            Err(StatusError::InvalidRequest(_))
        ));
        assert!(matches!(
            StatusList::open(&payload, Some(&SymmetricKey::generate())),
            Err(StatusError::DecryptionError(_))
        ));
    }

    #[test]
    fn test_open_rejects_key_for_plain_list() {
        let list = StatusList::allocate(8, StatusPurpose::Revocation).unwrap();
        let payload = list.seal(Encoding::Base64Url, None).unwrap();
        assert!(!payload.metadata.encrypted);
        assert!(StatusList::open(&payload, Some(&SymmetricKey::generate())).is_err());
        assert_eq!(StatusList::open(&payload, None).unwrap(), list);
    }
}
