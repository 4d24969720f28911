// =============================================================================
// orchestrator_status.json — written exclusively by the Orchestrator
// =============================================================================

use super::StateDir;
use crate::types::OrchestratorStatus;

const FILE: &str = "orchestrator_status.json";

pub fn load(dir: &StateDir) -> Option<OrchestratorStatus> {
    super::atomic::read_unlocked(dir.path(FILE))
}

pub fn save(dir: &StateDir, status: &OrchestratorStatus) -> anyhow::Result<()> {
    super::atomic::write_atomic(dir.path(FILE), status, dir.lock_timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ServiceState, ServiceStatus};

    #[test]
    fn absent_status_file_yields_none() {
        let root = std::env::temp_dir().join(format!("aurora-st-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).unwrap();
        let dir = StateDir::new(root, std::time::Duration::from_secs(5));
        assert!(load(&dir).is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let root = std::env::temp_dir().join(format!("aurora-st-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).unwrap();
        let dir = StateDir::new(root, std::time::Duration::from_secs(5));

        let status = OrchestratorStatus {
            generated_at: 100,
            services: vec![ServiceStatus {
                name: "scanner".into(),
                state: ServiceState::Running,
                pid: Some(123),
                heartbeat_age_seconds: Some(2),
                restart_count: 0,
            }],
        };
        save(&dir, &status).unwrap();
        let loaded = load(&dir).unwrap();
        assert_eq!(loaded.services.len(), 1);
        assert_eq!(loaded.services[0].name, "scanner");
    }
}
