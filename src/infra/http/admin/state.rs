use std::sync::Arc;

use crate::application::publish::PublishService;
use crate::application::repos::{ContentRepo, UrlResolver};
use crate::config::AdminSettings;
use crate::fastly::{Purger, SettingsAccessor};

#[derive(Clone)]
pub struct AdminState {
    pub content: Arc<dyn ContentRepo>,
    pub resolver: Arc<dyn UrlResolver>,
    pub publish: PublishService,
    pub purger: Arc<dyn Purger>,
    pub settings: SettingsAccessor,
    pub admin: AdminSettings,
}
