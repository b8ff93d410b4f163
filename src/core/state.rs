use std::sync::Arc;

use crate::core::config::Settings;
use crate::services::answer_key::AnswerKey;
use crate::services::storage::StorageService;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    answer_key: AnswerKey,
    storage: Option<StorageService>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        answer_key: AnswerKey,
        storage: Option<StorageService>,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, answer_key, storage }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn answer_key(&self) -> &AnswerKey {
        &self.inner.answer_key
    }

    pub(crate) fn storage(&self) -> Option<&StorageService> {
        self.inner.storage.as_ref()
    }
}
