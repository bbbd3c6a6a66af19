//! Docker cleanup on the container host, over SSH.
//!
//! Cleanup is best-effort by design: a failure here must never abort the
//! deployment pipeline, so errors are reported as warnings only.

use crate::util::log;
use crate::util::ssh::SshTarget;

/// Shell script run remotely to tear down the service's containers,
/// network and volumes. Individual steps tolerate absence (`|| true`).
fn cleanup_script(network: &str) -> String {
    format!(
        r#"
CONTAINERS=$(docker network inspect {network} --format '{{{{range .Containers}}}}{{{{.Name}}}} {{{{end}}}}' 2>/dev/null || echo '')

if [ -n "$CONTAINERS" ]; then
    echo "Stopping containers: $CONTAINERS"
    for container in $CONTAINERS; do
        docker stop "$container" 2>/dev/null || true
        docker rm -f "$container" 2>/dev/null || true
    done
fi

for container in {network} {network}-postgres {network}-redis; do
    docker stop "$container" 2>/dev/null || true
    docker rm -f "$container" 2>/dev/null || true
done

docker network inspect {network} --format '{{{{range $key, $value := .Containers}}}}{{{{println $key}}}}{{{{end}}}}' 2>/dev/null | while read container_id; do
    if [ -n "$container_id" ]; then
        docker network disconnect -f {network} "$container_id" 2>/dev/null || true
    fi
done

docker network rm {network} 2>/dev/null || true

for volume in {network}_postgres_data {network}_redis_data; do
    docker volume rm "$volume" 2>/dev/null || true
done
echo "Docker cleanup completed (containers, network, volumes)"
"#,
        network = network
    )
}

/// Remove the service's Docker containers, network and data volumes.
/// Always returns; failures are non-fatal warnings.
pub fn cleanup_resources(host: &SshTarget, network: &str) {
    log::step("Cleaning up Docker resources...");

    match host.exec(&cleanup_script(network)) {
        Ok(output) if output.status.success() => {
            log::info("Docker cleanup completed");
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::warn(&format!("Docker cleanup had issues: {}", stderr.trim()));
        }
        Err(e) => {
            log::warn(&format!("Docker cleanup failed: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_script_targets_network() {
        let script = cleanup_script("infisical");
        assert!(script.contains("docker network rm infisical"));
        assert!(script.contains("infisical_postgres_data"));
        assert!(script.contains("infisical-redis"));
    }

    #[test]
    fn test_cleanup_script_is_tolerant() {
        // every destructive command must tolerate absent resources
        let script = cleanup_script("net");
        for line in script.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with("docker stop")
                || trimmed.starts_with("docker rm")
                || trimmed.starts_with("docker network rm")
                || trimmed.starts_with("docker volume rm")
            {
                assert!(trimmed.ends_with("|| true"), "not tolerant: {}", trimmed);
            }
        }
    }
}
