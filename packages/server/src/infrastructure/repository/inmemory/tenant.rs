//! InMemory TenantResolver 実装
//!
//! 起動時に設定されたウィジェットキーとテナントの対応表で解決します。

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{ResolveError, TenantKey, TenantResolver, WidgetKey};

#[derive(Debug, Clone)]
struct WidgetRegistration {
    tenant: TenantKey,
    enabled: bool,
}

/// インメモリ TenantResolver 実装
#[derive(Debug, Default)]
pub struct InMemoryTenantResolver {
    widgets: HashMap<WidgetKey, WidgetRegistration>,
}

impl InMemoryTenantResolver {
    /// 新しい InMemoryTenantResolver を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a widget key for a tenant.
    pub fn with_widget(mut self, widget_key: WidgetKey, tenant: TenantKey, enabled: bool) -> Self {
        self.widgets
            .insert(widget_key, WidgetRegistration { tenant, enabled });
        self
    }

    /// 登録済みウィジェット数
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

#[async_trait]
impl TenantResolver for InMemoryTenantResolver {
    async fn resolve(&self, widget_key: &WidgetKey) -> Result<TenantKey, ResolveError> {
        let registration = self
            .widgets
            .get(widget_key)
            .ok_or_else(|| ResolveError::NotFound(widget_key.to_string()))?;

        if !registration.enabled {
            return Err(ResolveError::Disabled(widget_key.to_string()));
        }
        Ok(registration.tenant.clone())
    }
}
