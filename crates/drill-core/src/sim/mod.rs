//! In-memory backends
//!
//! Stand-ins for the backup catalog and provisioning service. They back
//! the `--simulate` mode of the binary and the pipeline tests. Production
//! drills plug in real provider clients behind the same traits.

mod catalog;
mod provisioner;

pub use catalog::{seed_catalog, InMemoryBackupCatalog};
pub use provisioner::{
    FailingProvisioner, ScriptedProvisioner, SimulatedProvisioner, SIM_VOLUME_SIZE_GIB,
};

use chrono::NaiveDate;
use drill_types::{LabelPolicy, TargetParams, TargetSpec};

fn sample_labels() -> LabelPolicy {
    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    LabelPolicy::for_run("BackupTest", date, 0)
}

/// `db.t3.micro`, private, default zone
pub fn sample_database_target() -> TargetSpec {
    TargetSpec {
        params: TargetParams::Database {
            instance_class: "db.t3.micro".to_string(),
            availability_zone: None,
            publicly_accessible: false,
        },
        labels: sample_labels(),
    }
}

/// `gp3` in `us-east-1a`
pub fn sample_volume_target() -> TargetSpec {
    TargetSpec {
        params: TargetParams::Volume {
            availability_zone: "us-east-1a".to_string(),
            volume_type: "gp3".to_string(),
        },
        labels: sample_labels(),
    }
}
