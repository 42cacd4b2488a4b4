//! Credential status entries.
//!
//! An issued credential points at its status bit through a
//! `StatusList2021Entry`; the list is addressed as
//! `<collectionId>?resourceName=<name>&resourceType=<type>`.

use shared::constants::STATUS_ENTRY_TYPE;
use shared::error::{StatusError, StatusResult};
use shared::types::{
    CheckStatusRequest, CheckStatusResult, StatusAction, StatusListEntry, StatusListResourceType,
    StatusPurpose, UpdateStatusRequest, UpdateStatusResult,
};

use super::StatusService;

/// Location of a status bit, recovered from an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStatusEntry {
    pub collection_id: String,
    pub name: String,
    pub resource_type: StatusListResourceType,
    pub index: usize,
}

impl ParsedStatusEntry {
    pub fn purpose(&self) -> StatusPurpose {
        self.resource_type.purpose()
    }
}

/// Build the entry to embed in a credential's `credentialStatus`
pub fn status_entry(
    collection_id: &str,
    name: &str,
    resource_type: StatusListResourceType,
    index: usize,
) -> StatusListEntry {
    let credential = format!(
        "{collection_id}?resourceName={}&resourceType={}",
        urlencoding::encode(name),
        resource_type.as_str()
    );

    StatusListEntry {
        id: format!("{credential}#{index}"),
        entry_type: STATUS_ENTRY_TYPE.to_string(),
        status_purpose: resource_type.purpose(),
        status_list_index: index.to_string(),
        status_list_credential: credential,
    }
}

/// Reverse of [`status_entry`]
pub fn parse_status_entry(entry: &StatusListEntry) -> StatusResult<ParsedStatusEntry> {
    if entry.entry_type != STATUS_ENTRY_TYPE {
        return Err(invalid(format!("unsupported status entry type '{}'", entry.entry_type)));
    }

    let index = entry
        .status_list_index
        .trim()
        .parse::<usize>()
        .map_err(|_| invalid(format!("invalid statusListIndex '{}'", entry.status_list_index)))?;

    let (collection_id, query) = entry
        .status_list_credential
        .split_once('?')
        .ok_or_else(|| invalid("statusListCredential carries no query".to_string()))?;
    if collection_id.is_empty() {
        return Err(invalid("statusListCredential carries no collection id".to_string()));
    }

    let mut name = None;
    let mut resource_type = None;
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)
            .map_err(|_| invalid(format!("invalid encoding in '{pair}'")))?
            .into_owned();
        match key {
            "resourceName" => name = Some(value),
            "resourceType" => {
                resource_type = Some(
                    StatusListResourceType::parse(&value)
                        .ok_or_else(|| invalid(format!("unknown resourceType '{value}'")))?,
                )
            }
            _ => {}
        }
    }

    let name = name.ok_or_else(|| invalid("statusListCredential has no resourceName".to_string()))?;
    let resource_type =
        resource_type.ok_or_else(|| {
            invalid("statusListCredential has no resourceType".to_string())
        })?;

    if resource_type.purpose() != entry.status_purpose {
        return Err(invalid(format!(
            "statusPurpose '{}' does not match resourceType '{resource_type}'",
            entry.status_purpose
        )));
    }

    Ok(ParsedStatusEntry {
        collection_id: collection_id.to_string(),
        name,
        resource_type,
        index,
    })
}

fn invalid(message: String) -> StatusError {
    StatusError::InvalidRequest(message)
}

impl StatusService {
    /// Check the bit a credential's status entry points at
    pub async fn check_entry(
        &self,
        entry: &StatusListEntry,
        key: Option<String>,
    ) -> StatusResult<CheckStatusResult> {
        let parsed = parse_status_entry(entry)?;
        self.check(CheckStatusRequest {
            collection_id: parsed.collection_id,
            name: parsed.name,
            index: parsed.index,
            purpose: Some(parsed.resource_type.purpose()),
            encrypted: Some(parsed.resource_type.is_encrypted()),
            key,
            version: None,
        })
        .await
    }

    /// Apply `action` to the bit a credential's status entry points at
    pub async fn update_entry(
        &self,
        entry: &StatusListEntry,
        action: StatusAction,
        key: Option<String>,
        publish: bool,
    ) -> StatusResult<UpdateStatusResult> {
        let parsed = parse_status_entry(entry)?;
        self.update(UpdateStatusRequest {
            collection_id: parsed.collection_id,
            name: parsed.name,
            indices: vec![parsed.index],
            action,
            publish,
            purpose: Some(parsed.resource_type.purpose()),
            encrypted: Some(parsed.resource_type.is_encrypted()),
            key,
            version: None,
        })
        .await
    }
}
