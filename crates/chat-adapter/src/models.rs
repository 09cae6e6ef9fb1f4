//! Built-in model catalog.
//!
//! Catalog ids are the stable names callers pick from; each maps to a
//! registered provider id and the upstream model name.

use crate::model::ModelRef;
use crate::vendors::compatible::COMPATIBLE_PROVIDER;
use crate::vendors::dashscope::DASHSCOPE_PROVIDER;

/// Model used when the caller does not pick one.
pub const DEFAULT_CHAT_MODEL: &str = "bailian-qwen";
/// Model used for conversation titles.
pub const TITLE_MODEL: &str = "title-model";

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct CatalogModel {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub provider: &'static str,
    pub model: &'static str,
    /// Whether the model is offered for chat (internal models are not).
    pub chat: bool,
}

impl CatalogModel {
    pub fn model_ref(&self) -> ModelRef {
        ModelRef::new(self.provider, self.model)
    }
}

pub const MODEL_CATALOG: &[CatalogModel] = &[
    CatalogModel {
        id: "bailian-qwen",
        name: "通义千问",
        description: "阿里百炼通义千问大模型",
        provider: DASHSCOPE_PROVIDER,
        model: "qwen-max",
        chat: true,
    },
    CatalogModel {
        id: "bailian-qwen-long",
        name: "通义千问长文本",
        description: "阿里百炼通义千问长文本大模型，支持更长的上下文",
        provider: DASHSCOPE_PROVIDER,
        model: "qwen-max-longcontext",
        chat: true,
    },
    CatalogModel {
        id: "deepseek-r1",
        name: "DeepSeek-R1",
        description: "DeepSeek 推理模型，回答前输出思考过程",
        provider: COMPATIBLE_PROVIDER,
        model: "deepseek-r1",
        chat: true,
    },
    CatalogModel {
        id: TITLE_MODEL,
        name: "标题生成",
        description: "根据首条消息生成对话标题",
        provider: DASHSCOPE_PROVIDER,
        model: "qwen-max",
        chat: false,
    },
];

pub fn find(id: &str) -> Option<&'static CatalogModel> {
    MODEL_CATALOG.iter().find(|m| m.id == id)
}

/// Models offered for chat, in catalog order.
pub fn chat_models() -> impl Iterator<Item = &'static CatalogModel> {
    MODEL_CATALOG.iter().filter(|m| m.chat)
}

/// Resolves a catalog id, or an explicit `provider/model` pair.
pub fn resolve(id: &str) -> Option<ModelRef> {
    let id = id.trim();
    if let Some(entry) = find(id) {
        return Some(entry.model_ref());
    }
    let (provider, model) = id.split_once('/')?;
    let (provider, model) = (provider.trim(), model.trim());
    (!provider.is_empty() && !model.is_empty()).then(|| ModelRef::new(provider, model))
}

pub fn default_chat_model() -> ModelRef {
    resolve(DEFAULT_CHAT_MODEL).unwrap_or_else(|| ModelRef::new(DASHSCOPE_PROVIDER, "qwen-max"))
}

pub fn title_model() -> ModelRef {
    resolve(TITLE_MODEL).unwrap_or_else(|| ModelRef::new(DASHSCOPE_PROVIDER, "qwen-max"))
}
