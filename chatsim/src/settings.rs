//! Per-profile settings persisted in the profile collection: access lists and custom roles.
//!
//! gchat (`custom.gchat`): `enabled_users`, `disabled_users`, `gchat_for_all`,
//! `custom_roles.<user>`.
//! wchat (`custom.wchat`): `enabled_topics`, `disabled_topics`, `wchat_for_all_groups`,
//! `group_roles`, `custom_roles.<group>:<thread>`.
//!
//! A disabled entry always wins over "for all".

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chatsim_core::ConversationId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use storage::{KvStore, KvStoreExt, StorageError};
use tracing::info;

use crate::history::HistoryStore;

pub const GCHAT_COLLECTION: &str = "custom.gchat";
pub const WCHAT_COLLECTION: &str = "custom.wchat";

const ENABLED_USERS: &str = "enabled_users";
const DISABLED_USERS: &str = "disabled_users";
const GCHAT_FOR_ALL: &str = "gchat_for_all";
const ENABLED_TOPICS: &str = "enabled_topics";
const DISABLED_TOPICS: &str = "disabled_topics";
const WCHAT_FOR_ALL_GROUPS: &str = "wchat_for_all_groups";
const GROUP_ROLES: &str = "group_roles";

fn role_key(conversation: &ConversationId) -> String {
    format!("custom_roles.{}", conversation)
}

/// Access and role lookup used by the chat pipelines.
#[async_trait]
pub trait ConversationSettings: Send + Sync {
    async fn is_enabled(&self, conversation: &ConversationId) -> Result<bool, StorageError>;

    /// Role text for the history preamble.
    async fn role(&self, conversation: &ConversationId) -> Result<String, StorageError>;
}

/// Adds `item` to the list at `key` unless present. Returns true when the list changed.
///
/// Not atomic: the list helpers are only called from owner commands and must not race
/// with each other on one key.
pub(crate) async fn list_insert<T>(
    store: &dyn KvStore,
    namespace: &str,
    key: &str,
    item: T,
) -> Result<bool, StorageError>
where
    T: Serialize + DeserializeOwned + PartialEq + Send + Sync,
{
    let mut items: Vec<T> = store.get_or(namespace, key, Vec::new()).await?;
    if items.contains(&item) {
        return Ok(false);
    }
    items.push(item);
    store.set(namespace, key, &items).await?;
    Ok(true)
}

/// Removes every occurrence of `item`. Returns true when the list changed.
pub(crate) async fn list_remove<T>(
    store: &dyn KvStore,
    namespace: &str,
    key: &str,
    item: &T,
) -> Result<bool, StorageError>
where
    T: Serialize + DeserializeOwned + PartialEq + Send + Sync,
{
    let mut items: Vec<T> = store.get_or(namespace, key, Vec::new()).await?;
    let before = items.len();
    items.retain(|existing| existing != item);
    if items.len() == before {
        return Ok(false);
    }
    store.set(namespace, key, &items).await?;
    Ok(true)
}

pub(crate) async fn list_contains<T>(
    store: &dyn KvStore,
    namespace: &str,
    key: &str,
    item: &T,
) -> Result<bool, StorageError>
where
    T: DeserializeOwned + PartialEq + Send,
{
    let items: Vec<T> = store.get_or(namespace, key, Vec::new()).await?;
    Ok(items.contains(item))
}

async fn stored_role(
    store: &dyn KvStore,
    namespace: &str,
    conversation: &ConversationId,
) -> Result<Option<String>, StorageError> {
    let role: Option<String> = store.get(namespace, &role_key(conversation)).await?;
    Ok(role.filter(|r| !r.trim().is_empty()))
}

/// Private-chat settings.
#[derive(Clone)]
pub struct GChatSettings {
    store: Arc<dyn KvStore>,
    default_role: String,
    history: HistoryStore,
}

impl GChatSettings {
    pub fn new(store: Arc<dyn KvStore>, default_role: impl Into<String>, history: HistoryStore) -> Self {
        Self {
            store,
            default_role: default_role.into(),
            history,
        }
    }

    pub fn default_role(&self) -> &str {
        &self.default_role
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub async fn is_user_disabled(&self, user_id: i64) -> Result<bool, StorageError> {
        list_contains(self.store.as_ref(), GCHAT_COLLECTION, DISABLED_USERS, &user_id).await
    }

    pub async fn enable(&self, user_id: i64) -> Result<(), StorageError> {
        list_remove(self.store.as_ref(), GCHAT_COLLECTION, DISABLED_USERS, &user_id).await?;
        list_insert(self.store.as_ref(), GCHAT_COLLECTION, ENABLED_USERS, user_id).await?;
        info!(user_id, "gchat enabled");
        Ok(())
    }

    pub async fn disable(&self, user_id: i64) -> Result<(), StorageError> {
        list_insert(self.store.as_ref(), GCHAT_COLLECTION, DISABLED_USERS, user_id).await?;
        list_remove(self.store.as_ref(), GCHAT_COLLECTION, ENABLED_USERS, &user_id).await?;
        info!(user_id, "gchat disabled");
        Ok(())
    }

    /// Flips `gchat_for_all`; returns the new value.
    pub async fn toggle_all(&self) -> Result<bool, StorageError> {
        let current: bool = self.store.get_or(GCHAT_COLLECTION, GCHAT_FOR_ALL, false).await?;
        self.store.set(GCHAT_COLLECTION, GCHAT_FOR_ALL, &!current).await?;
        Ok(!current)
    }

    /// Stores `role` (or the default role for `None`/blank) and clears the history.
    /// Returns the stored role.
    pub async fn set_role(&self, user_id: i64, role: Option<&str>) -> Result<String, StorageError> {
        let conversation = ConversationId::User(user_id);
        let role = role
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(&self.default_role)
            .to_string();
        self.store
            .set(GCHAT_COLLECTION, &role_key(&conversation), &role)
            .await?;
        self.history.clear(&conversation).await?;
        Ok(role)
    }
}

#[async_trait]
impl ConversationSettings for GChatSettings {
    async fn is_enabled(&self, conversation: &ConversationId) -> Result<bool, StorageError> {
        let ConversationId::User(user_id) = conversation else {
            return Ok(false);
        };
        if self.is_user_disabled(*user_id).await? {
            return Ok(false);
        }
        if self.store.get_or(GCHAT_COLLECTION, GCHAT_FOR_ALL, false).await? {
            return Ok(true);
        }
        list_contains(self.store.as_ref(), GCHAT_COLLECTION, ENABLED_USERS, user_id).await
    }

    async fn role(&self, conversation: &ConversationId) -> Result<String, StorageError> {
        Ok(stored_role(self.store.as_ref(), GCHAT_COLLECTION, conversation)
            .await?
            .unwrap_or_else(|| self.default_role.clone()))
    }
}

/// Group-topic settings.
#[derive(Clone)]
pub struct WChatSettings {
    store: Arc<dyn KvStore>,
    default_role: String,
    history: HistoryStore,
}

impl WChatSettings {
    pub fn new(store: Arc<dyn KvStore>, default_role: impl Into<String>, history: HistoryStore) -> Self {
        Self {
            store,
            default_role: default_role.into(),
            history,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub async fn enable_topic(&self, topic: &ConversationId) -> Result<(), StorageError> {
        let id = topic.to_string();
        list_remove(self.store.as_ref(), WCHAT_COLLECTION, DISABLED_TOPICS, &id).await?;
        list_insert(self.store.as_ref(), WCHAT_COLLECTION, ENABLED_TOPICS, id).await?;
        info!(topic = %topic, "wchat enabled");
        Ok(())
    }

    pub async fn disable_topic(&self, topic: &ConversationId) -> Result<(), StorageError> {
        let id = topic.to_string();
        list_insert(self.store.as_ref(), WCHAT_COLLECTION, DISABLED_TOPICS, id.clone()).await?;
        list_remove(self.store.as_ref(), WCHAT_COLLECTION, ENABLED_TOPICS, &id).await?;
        info!(topic = %topic, "wchat disabled");
        Ok(())
    }

    /// Flips "all topics" for one group; returns the new value.
    pub async fn toggle_group(&self, group_id: i64) -> Result<bool, StorageError> {
        let mut groups: BTreeMap<String, bool> = self
            .store
            .get_or(WCHAT_COLLECTION, WCHAT_FOR_ALL_GROUPS, BTreeMap::new())
            .await?;
        let flag = groups.entry(group_id.to_string()).or_insert(false);
        *flag = !*flag;
        let enabled = *flag;
        self.store
            .set(WCHAT_COLLECTION, WCHAT_FOR_ALL_GROUPS, &groups)
            .await?;
        Ok(enabled)
    }

    async fn group_roles(&self) -> Result<BTreeMap<String, String>, StorageError> {
        self.store
            .get_or(WCHAT_COLLECTION, GROUP_ROLES, BTreeMap::new())
            .await
    }

    /// Group role, or the default role when none is set.
    pub async fn group_role(&self, group_id: i64) -> Result<String, StorageError> {
        Ok(self
            .group_roles()
            .await?
            .remove(&group_id.to_string())
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| self.default_role.clone()))
    }

    /// Sets the group role, or removes it for `None`/blank. Histories are kept.
    pub async fn set_group_role(&self, group_id: i64, role: Option<&str>) -> Result<(), StorageError> {
        let mut roles = self.group_roles().await?;
        match role.map(str::trim).filter(|r| !r.is_empty()) {
            Some(role) => {
                roles.insert(group_id.to_string(), role.to_string());
            }
            None => {
                roles.remove(&group_id.to_string());
            }
        }
        self.store.set(WCHAT_COLLECTION, GROUP_ROLES, &roles).await
    }

    /// Stores the topic role (`None`/blank stores the group role) and clears the topic history.
    /// Returns the stored role.
    pub async fn set_topic_role(
        &self,
        topic: &ConversationId,
        role: Option<&str>,
    ) -> Result<String, StorageError> {
        let role = match role.map(str::trim).filter(|r| !r.is_empty()) {
            Some(role) => role.to_string(),
            None => match topic.group() {
                Some(group) => self.group_role(group).await?,
                None => self.default_role.clone(),
            },
        };
        self.store
            .set(WCHAT_COLLECTION, &role_key(topic), &role)
            .await?;
        self.history.clear(topic).await?;
        Ok(role)
    }
}

#[async_trait]
impl ConversationSettings for WChatSettings {
    async fn is_enabled(&self, conversation: &ConversationId) -> Result<bool, StorageError> {
        let Some(group) = conversation.group() else {
            return Ok(false);
        };
        let id = conversation.to_string();
        if list_contains(self.store.as_ref(), WCHAT_COLLECTION, DISABLED_TOPICS, &id).await? {
            return Ok(false);
        }
        let groups: BTreeMap<String, bool> = self
            .store
            .get_or(WCHAT_COLLECTION, WCHAT_FOR_ALL_GROUPS, BTreeMap::new())
            .await?;
        if groups.get(&group.to_string()).copied().unwrap_or(false) {
            return Ok(true);
        }
        list_contains(self.store.as_ref(), WCHAT_COLLECTION, ENABLED_TOPICS, &id).await
    }

    /// Topic role, then group role, then the default role.
    async fn role(&self, conversation: &ConversationId) -> Result<String, StorageError> {
        if let Some(role) = stored_role(self.store.as_ref(), WCHAT_COLLECTION, conversation).await? {
            return Ok(role);
        }
        match conversation.group() {
            Some(group) => self.group_role(group).await,
            None => Ok(self.default_role.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::InMemoryKvStore;

    fn store() -> Arc<dyn KvStore> {
        Arc::new(InMemoryKvStore::new())
    }

    fn gchat(store: Arc<dyn KvStore>) -> GChatSettings {
        let history = HistoryStore::new(store.clone(), GCHAT_COLLECTION, 200);
        GChatSettings::new(store, "default gchat role", history)
    }

    fn wchat(store: Arc<dyn KvStore>) -> WChatSettings {
        let history = HistoryStore::new(store.clone(), WCHAT_COLLECTION, 200);
        WChatSettings::new(store, "default wchat role", history)
    }

    #[tokio::test]
    async fn gchat_access_lists() {
        let settings = gchat(store());
        let user = ConversationId::User(7);

        assert!(!settings.is_enabled(&user).await.unwrap());

        settings.enable(7).await.unwrap();
        assert!(settings.is_enabled(&user).await.unwrap());

        settings.disable(7).await.unwrap();
        assert!(!settings.is_enabled(&user).await.unwrap());

        assert!(settings.toggle_all().await.unwrap());
        assert!(settings.is_enabled(&ConversationId::User(8)).await.unwrap());
        assert!(
            !settings.is_enabled(&user).await.unwrap(),
            "disabled wins over for-all"
        );
        assert!(!settings.toggle_all().await.unwrap());
    }

    /// **Test: Role change stores the role and clears the user's history.**
    #[tokio::test]
    async fn gchat_role_change_clears_history() {
        let settings = gchat(store());
        let user = ConversationId::User(3);
        settings
            .history()
            .push_turn(&user, "old", "Ann", "hi")
            .await
            .unwrap();

        let stored = settings.set_role(3, Some("a pirate")).await.unwrap();

        assert_eq!(stored, "a pirate");
        assert_eq!(settings.role(&user).await.unwrap(), "a pirate");
        assert!(settings.history().load(&user).await.unwrap().is_none());

        let reset = settings.set_role(3, Some("   ")).await.unwrap();
        assert_eq!(reset, "default gchat role");
    }

    #[tokio::test]
    async fn wchat_topic_and_group_access() {
        let settings = wchat(store());
        let topic = ConversationId::topic(-100, Some(5));
        let other = ConversationId::topic(-100, Some(6));

        settings.enable_topic(&topic).await.unwrap();
        assert!(settings.is_enabled(&topic).await.unwrap());
        assert!(!settings.is_enabled(&other).await.unwrap());

        assert!(settings.toggle_group(-100).await.unwrap());
        assert!(settings.is_enabled(&other).await.unwrap());
        assert!(!settings
            .is_enabled(&ConversationId::topic(-200, None))
            .await
            .unwrap());

        settings.disable_topic(&other).await.unwrap();
        assert!(!settings.is_enabled(&other).await.unwrap());
        assert!(!settings.is_enabled(&ConversationId::User(1)).await.unwrap());
    }

    /// **Test: Role lookup order is topic, then group, then default.**
    #[tokio::test]
    async fn wchat_role_resolution() {
        let settings = wchat(store());
        let topic = ConversationId::topic(-100, Some(5));

        assert_eq!(settings.role(&topic).await.unwrap(), "default wchat role");

        settings.set_group_role(-100, Some("group role")).await.unwrap();
        assert_eq!(settings.role(&topic).await.unwrap(), "group role");

        settings.set_topic_role(&topic, Some("topic role")).await.unwrap();
        assert_eq!(settings.role(&topic).await.unwrap(), "topic role");

        let reset = settings.set_topic_role(&topic, None).await.unwrap();
        assert_eq!(reset, "group role");

        settings.set_group_role(-100, None).await.unwrap();
        assert_eq!(
            settings.role(&ConversationId::topic(-100, Some(9))).await.unwrap(),
            "default wchat role"
        );
    }
}
