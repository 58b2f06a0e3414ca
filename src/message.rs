use serde::{Deserialize, Serialize};

use crate::ids::{GroupID, MessageID, Version};
use crate::update::Update;

/// A single edit in flight between a client and the coordinator. `version`
/// is the baseline the update was authored against on send; the coordinator
/// overwrites it with the newly assigned version before broadcasting an
/// acceptance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub version: Version,
    pub group_id: GroupID,
    pub update: Update,
    pub message_id: MessageID,
}

impl Message {
    pub fn new(version: Version, group_id: GroupID, update: Update) -> Self {
        Self { version, group_id, update, message_id: MessageID::fresh() }
    }
}
