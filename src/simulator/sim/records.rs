use serde::{Deserialize, Serialize};

/// One entry in a model's activity history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
  pub cycle: u64,
  pub action: String,
  pub subject: String,
}

/// Models that keep a history and can describe their current status
pub trait Reportable {
  fn id(&self) -> &str;
  fn status(&self) -> String;
  fn records(&self) -> &[ModelRecord];
}

/// Macro to push a ModelRecord stamped with the model's current cycle
///
/// Usage:
/// ```ignore
/// model_record!(self, "action_name", "subject string");
/// model_record!(self, "action_name", format!("formatted {}", value));
/// ```
#[macro_export]
macro_rules! model_record {
  ($self:expr, $action:expr, $subject:expr) => {
    $self.records.push($crate::simulator::sim::records::ModelRecord {
      cycle: $self.cycle,
      action: $action.to_string(),
      subject: $subject.to_string(),
    });
  };
}
