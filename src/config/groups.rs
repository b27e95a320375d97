//! Option group registration
//!
//! An option group is a clap `Args` struct that the merger fills. Groups are
//! registered as a tuple so parsing hands back one typed value per group, in
//! declaration order.

use clap::{ArgMatches, Args, Command, FromArgMatches};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};
use crate::options::{ScriptArguments, TrainingArguments};

/// Role a group plays in cross-group post-processing.
pub enum GroupRole<'a> {
    /// Generic training arguments (possibly embedded in a trainer config).
    Training(&'a mut TrainingArguments),
    /// Script arguments carrying the reentrant checkpointing flag.
    Script(&'a ScriptArguments),
    Other,
}

/// A typed collection of related options merged as one unit.
pub trait OptionGroup: Args + FromArgMatches + Serialize {
    /// Key the group is reported under in resolved configurations.
    const NAME: &'static str;

    fn role(&mut self) -> GroupRole<'_> {
        GroupRole::Other
    }

    /// Reject value combinations that cannot be handed to a trainer.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// A tuple of option groups parsed together.
pub trait OptionGroups: Sized {
    fn augment(command: Command) -> Command;

    fn from_matches(matches: &ArgMatches) -> Result<Self>;

    fn validate(&self) -> Result<()>;

    /// Apply adjustments that couple otherwise independent groups.
    fn post_process(&mut self);

    /// Serialize every group under its [`OptionGroup::NAME`].
    fn describe(&self) -> std::result::Result<Map<String, Value>, serde_json::Error>;
}

/// Propagate the script group's reentrant flag into the training group's
/// `gradient_checkpointing_kwargs`. Other kwargs are kept.
pub fn post_process_roles(roles: Vec<GroupRole<'_>>) {
    let mut training = None;
    let mut use_reentrant = None;

    for role in roles {
        match role {
            GroupRole::Training(args) => training = Some(args),
            GroupRole::Script(script) => {
                use_reentrant = Some(script.gradient_checkpointing_use_reentrant)
            }
            GroupRole::Other => {}
        }
    }

    if let (Some(training), Some(use_reentrant)) = (training, use_reentrant) {
        training
            .gradient_checkpointing_kwargs
            .get_or_insert_with(Map::new)
            .insert("use_reentrant".to_string(), Value::Bool(use_reentrant));
        tracing::debug!("Set gradient_checkpointing_kwargs.use_reentrant = {}", use_reentrant);
    }
}

macro_rules! impl_option_groups {
    ($($group:ident),+) => {
        impl<$($group: OptionGroup),+> OptionGroups for ($($group,)+) {
            fn augment(command: Command) -> Command {
                $(let command = $group::augment_args(command);)+
                command
            }

            fn from_matches(matches: &ArgMatches) -> Result<Self> {
                Ok(($($group::from_arg_matches(matches).map_err(ConfigError::from)?,)+))
            }

            #[allow(non_snake_case)]
            fn validate(&self) -> Result<()> {
                let ($($group,)+) = self;
                $($group.validate()?;)+
                Ok(())
            }

            #[allow(non_snake_case)]
            fn post_process(&mut self) {
                let ($($group,)+) = self;
                post_process_roles(vec![$($group.role()),+]);
            }

            #[allow(non_snake_case)]
            fn describe(&self) -> std::result::Result<Map<String, Value>, serde_json::Error> {
                let ($($group,)+) = self;
                let mut described = Map::new();
                $(described.insert($group::NAME.to_string(), serde_json::to_value($group)?);)+
                Ok(described)
            }
        }
    };
}

impl_option_groups!(A);
impl_option_groups!(A, B);
impl_option_groups!(A, B, C);
impl_option_groups!(A, B, C, D);
impl_option_groups!(A, B, C, D, E);
