//! Animation parameters.
//!
//! The avatar only sets named parameters; blending lives in whatever
//! consumes them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const PARAM_HORIZONTAL: &str = "Horizontal";
pub const PARAM_VERTICAL: &str = "Vertical";
pub const PARAM_RUNNING: &str = "Running";

/// Animation parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AnimParam {
    Float(f32),
    Bool(bool),
}

/// Named parameter set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Animator {
    params: BTreeMap<String, AnimParam>,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.params.insert(name.to_string(), AnimParam::Float(value));
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.params.insert(name.to_string(), AnimParam::Bool(value));
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.params.get(name) {
            Some(AnimParam::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.params.get(name) {
            Some(AnimParam::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
