use std::collections::HashMap;
use std::sync::LazyLock;

use sema_error::{DbError, Result};
use serde::{Deserialize, Serialize};

use crate::arrays::scalar::ScalarValue;

pub const DEFAULT_DATABASE: &str = "default";

/// Configuration for an analysis session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// User that privilege checks are performed for.
    pub user: String,
    /// Database used to resolve unqualified table names.
    pub default_database: String,
    /// If the statement is being analyzed for EXPLAIN.
    pub explain: bool,
    /// Label unnamed select list expressions `_c0`, `_c1`, ...
    pub use_hive_column_labels: bool,
    pub enable_privilege_checks: bool,
    /// Replaces the authorizer's message when a privilege check fails.
    pub auth_error_message: Option<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            user: String::new(),
            default_database: DEFAULT_DATABASE.to_string(),
            explain: false,
            use_hive_column_labels: false,
            enable_privilege_checks: true,
            auth_error_message: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn set_from_scalar(&mut self, name: &str, value: ScalarValue) -> Result<()> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| DbError::new(format!("Missing setting for '{name}'")))?;

        (func.set)(value, self)
    }

    pub fn get_as_scalar(&self, name: &str) -> Result<ScalarValue> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| DbError::new(format!("Missing setting for '{name}'")))?;

        Ok((func.get)(self))
    }

    pub fn reset(&mut self, name: &str) -> Result<()> {
        let def_conf = Self::default();

        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| DbError::new(format!("Missing setting for '{name}'")))?;

        let scalar = (func.get)(&def_conf);
        (func.set)(scalar, self)
    }

    pub fn reset_all(&mut self) {
        *self = Self::default();
    }

    /// Names and descriptions of all settings, sorted by name.
    pub fn settings() -> Vec<(&'static str, &'static str)> {
        let mut settings: Vec<_> = GET_SET_FUNCTIONS
            .iter()
            .map(|(name, funcs)| (*name, funcs.description))
            .collect();
        settings.sort_unstable();
        settings
    }
}

struct SettingFunctions {
    description: &'static str,
    set: fn(scalar: ScalarValue, conf: &mut AnalyzerConfig) -> Result<()>,
    get: fn(conf: &AnalyzerConfig) -> ScalarValue,
}

impl SettingFunctions {
    const fn new<S: AnalyzerSetting>() -> Self {
        SettingFunctions {
            description: S::DESCRIPTION,
            set: S::set_from_scalar as _,
            get: S::get_as_scalar as _,
        }
    }
}

fn insert_setting<S: AnalyzerSetting>(map: &mut HashMap<&'static str, SettingFunctions>) {
    if map.insert(S::NAME, SettingFunctions::new::<S>()).is_some() {
        panic!("Duplicate settings names: {}", S::NAME);
    }
}

static GET_SET_FUNCTIONS: LazyLock<HashMap<&'static str, SettingFunctions>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    insert_setting::<User>(&mut map);
    insert_setting::<DefaultDatabase>(&mut map);
    insert_setting::<Explain>(&mut map);
    insert_setting::<UseHiveColumnLabels>(&mut map);
    insert_setting::<EnablePrivilegeChecks>(&mut map);
    insert_setting::<AuthErrorMessage>(&mut map);

    map
});

pub trait AnalyzerSetting: Sync + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn set_from_scalar(scalar: ScalarValue, conf: &mut AnalyzerConfig) -> Result<()>;
    fn get_as_scalar(conf: &AnalyzerConfig) -> ScalarValue;
}

fn try_into_string(scalar: ScalarValue) -> Result<String> {
    match scalar {
        ScalarValue::Utf8(s) => Ok(s),
        other => Err(DbError::new(format!("Not a string: {other}"))),
    }
}

pub struct User;

impl AnalyzerSetting for User {
    const NAME: &'static str = "user";
    const DESCRIPTION: &'static str = "User that privilege checks are performed for";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut AnalyzerConfig) -> Result<()> {
        conf.user = try_into_string(scalar)?;
        Ok(())
    }

    fn get_as_scalar(conf: &AnalyzerConfig) -> ScalarValue {
        conf.user.clone().into()
    }
}

pub struct DefaultDatabase;

impl AnalyzerSetting for DefaultDatabase {
    const NAME: &'static str = "default_database";
    const DESCRIPTION: &'static str = "Database used for unqualified table names";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut AnalyzerConfig) -> Result<()> {
        let val = try_into_string(scalar)?;
        if val.is_empty() {
            return Err(DbError::new("Default database cannot be empty"));
        }
        conf.default_database = val.to_lowercase();
        Ok(())
    }

    fn get_as_scalar(conf: &AnalyzerConfig) -> ScalarValue {
        conf.default_database.clone().into()
    }
}

pub struct Explain;

impl AnalyzerSetting for Explain {
    const NAME: &'static str = "explain";
    const DESCRIPTION: &'static str = "Analyze statements for EXPLAIN";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut AnalyzerConfig) -> Result<()> {
        conf.explain = scalar.try_as_bool()?;
        Ok(())
    }

    fn get_as_scalar(conf: &AnalyzerConfig) -> ScalarValue {
        conf.explain.into()
    }
}

pub struct UseHiveColumnLabels;

impl AnalyzerSetting for UseHiveColumnLabels {
    const NAME: &'static str = "use_hive_column_labels";
    const DESCRIPTION: &'static str = "Label unnamed select list expressions _c0, _c1, ...";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut AnalyzerConfig) -> Result<()> {
        conf.use_hive_column_labels = scalar.try_as_bool()?;
        Ok(())
    }

    fn get_as_scalar(conf: &AnalyzerConfig) -> ScalarValue {
        conf.use_hive_column_labels.into()
    }
}

pub struct EnablePrivilegeChecks;

impl AnalyzerSetting for EnablePrivilegeChecks {
    const NAME: &'static str = "enable_privilege_checks";
    const DESCRIPTION: &'static str = "Check table privileges during analysis";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut AnalyzerConfig) -> Result<()> {
        conf.enable_privilege_checks = scalar.try_as_bool()?;
        Ok(())
    }

    fn get_as_scalar(conf: &AnalyzerConfig) -> ScalarValue {
        conf.enable_privilege_checks.into()
    }
}

pub struct AuthErrorMessage;

impl AnalyzerSetting for AuthErrorMessage {
    const NAME: &'static str = "auth_error_message";
    const DESCRIPTION: &'static str =
        "Message reported instead of the authorizer's when a privilege check fails";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut AnalyzerConfig) -> Result<()> {
        conf.auth_error_message = match scalar {
            ScalarValue::Null => None,
            other => {
                let msg = try_into_string(other)?;
                if msg.is_empty() { None } else { Some(msg) }
            }
        };
        Ok(())
    }

    fn get_as_scalar(conf: &AnalyzerConfig) -> ScalarValue {
        match &conf.auth_error_message {
            Some(msg) => msg.clone().into(),
            None => ScalarValue::Null,
        }
    }
}
