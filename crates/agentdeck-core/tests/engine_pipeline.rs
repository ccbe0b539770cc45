use std::path::PathBuf;

use agentdeck_core::config::EngineConfig;
use agentdeck_core::context::EngineContext;
use agentdeck_core::desired::DeploymentRequest;
use agentdeck_core::error::{BuildError, ResolveError};
use agentdeck_core::mcp::ServerKind;
use agentdeck_core::registry::FileCatalog;
use agentdeck_core::runtime::local::{GATEWAY_SERVICE, TargetSpec};
use agentdeck_core::runtime::{AiRuntimeConfig, RuntimeTarget};

const CATALOG: &str = r#"{
  "servers": [
    {
      "name": "filesystem",
      "packages": [{
        "registryType": "npm",
        "identifier": "@modelcontextprotocol/server-filesystem",
        "version": "1.0.2",
        "packageArguments": [{"type": "positional", "value": "/data"}]
      }]
    },
    {
      "name": "fetch",
      "packages": [{"registryType": "pypi", "identifier": "mcp-server-fetch"}],
      "remotes": [{
        "type": "streamable-http",
        "url": "https://fetch.example.com/mcp",
        "headers": [{"name": "Authorization", "isRequired": true}]
      }]
    }
  ],
  "agents": [
    {
      "name": "researcher",
      "version": "0.2.0",
      "image": "ghcr.io/example/researcher:0.2.0",
      "mcpServers": [{"name": "fetch", "preferRemote": true}]
    }
  ]
}"#;

const REQUEST: &str = r#"
[[agents]]
name = "researcher"

[[agents.mcp_servers]]
name = "fetch"
headers = { Authorization = "Bearer secret" }

[[mcp_servers]]
name = "filesystem"

[[mcp_servers]]
name = "fetch"
prefer_remote = true
headers = { Authorization = "Bearer secret" }
"#;

fn context() -> EngineContext {
    EngineContext::new(
        PathBuf::from("agentdeck.toml"),
        EngineConfig::default(),
        PathBuf::from("/tmp/agentdeck"),
    )
}

// =============================================================================
// Desired state
// =============================================================================

#[test]
fn request_resolves_agents_and_servers() {
    let catalog = FileCatalog::from_json(CATALOG).unwrap();
    let request = DeploymentRequest::from_toml(REQUEST).unwrap();

    let desired = context().builder(&catalog).build(&request).unwrap();

    assert_eq!(desired.agents.len(), 1);
    let agent = &desired.agents[0];
    assert_eq!(agent.resource_name(), "researcher-0.2.0");
    assert_eq!(agent.resolved_mcp_servers.len(), 1);
    assert_eq!(agent.resolved_mcp_servers[0].kind(), ServerKind::Remote);

    let names: Vec<_> = desired.mcp_servers.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["filesystem", "fetch"]);
    assert!(desired.mcp_servers[0].as_local().is_some());

    let remote = desired.mcp_servers[1].as_remote().unwrap();
    assert_eq!(remote.host, "fetch.example.com");
    assert_eq!(remote.port, 443);
    assert_eq!(remote.headers["Authorization"], "Bearer secret");
}

#[test]
fn missing_required_header_fails_the_build() {
    let catalog = FileCatalog::from_json(CATALOG).unwrap();
    let request = DeploymentRequest::from_toml(
        r#"
[[mcp_servers]]
name = "fetch"
prefer_remote = true
"#,
    )
    .unwrap();

    let err = context().builder(&catalog).build(&request).unwrap_err();
    assert!(matches!(
        err,
        BuildError::Resolve(ResolveError::MissingRequired { .. })
    ));
}

#[test]
fn unknown_server_fails_the_build() {
    let catalog = FileCatalog::from_json(CATALOG).unwrap();
    let request = DeploymentRequest::from_toml("[[mcp_servers]]\nname = \"nope\"\n").unwrap();

    assert!(context().builder(&catalog).build(&request).is_err());
}

// =============================================================================
// Local translation
// =============================================================================

#[test]
fn local_render_routes_every_server_through_the_gateway() {
    let catalog = FileCatalog::from_json(CATALOG).unwrap();
    let request = DeploymentRequest::from_toml(REQUEST).unwrap();

    let (_, runtime) = context().render(&catalog, &request, RuntimeTarget::Local).unwrap();
    let AiRuntimeConfig::Local(local) = runtime else {
        panic!("expected local runtime config");
    };

    let services: Vec<_> = local.compose.service_names().collect();
    assert!(services.contains(&GATEWAY_SERVICE));
    assert!(services.contains(&"filesystem"));
    assert!(services.contains(&"researcher-0.2.0"));
    // Remote servers are reached through the gateway only
    assert!(!services.contains(&"fetch"));

    let routes: Vec<_> = local.gateway.routes().map(|r| r.name.as_str()).collect();
    assert_eq!(routes, vec!["fetch", "filesystem"]);

    let fetch = local.gateway.routes().find(|r| r.name == "fetch").unwrap();
    assert_eq!(fetch.path_prefix(), Some("/fetch/mcp"));
    assert!(matches!(fetch.target(), Some(TargetSpec::Sse(_))));

    let agent = &local.compose.services["researcher-0.2.0"];
    assert!(agent.depends_on.contains(&GATEWAY_SERVICE.to_string()));
    assert_eq!(agent.volumes.len(), 1);
    assert!(agent.volumes[0].starts_with("./mcp-servers-researcher.json:"));
}

#[test]
fn agent_command_dependency_gets_a_service_and_route() {
    let catalog = FileCatalog::from_json(
        r#"{
          "servers": [{"name": "time", "packages": [{"registryType": "pypi", "identifier": "mcp-server-time"}]}],
          "agents": [{
            "name": "scout",
            "version": "0.1.0",
            "image": "ghcr.io/example/scout:0.1.0",
            "mcpServers": [{"name": "time"}]
          }]
        }"#,
    )
    .unwrap();
    let request = DeploymentRequest::from_toml("[[agents]]\nname = \"scout\"\n").unwrap();

    let (desired, runtime) = context().render(&catalog, &request, RuntimeTarget::Local).unwrap();
    assert_eq!(desired.agents[0].resolved_mcp_servers[0].kind(), ServerKind::Command);

    let AiRuntimeConfig::Local(local) = runtime else {
        panic!("expected local runtime config");
    };
    let services: Vec<_> = local.compose.service_names().collect();
    assert_eq!(services, vec![GATEWAY_SERVICE, "scout-0.1.0", "time"]);

    let routes: Vec<_> = local.gateway.routes().map(|r| r.name.as_str()).collect();
    assert_eq!(routes, vec!["time"]);
}

#[test]
fn local_render_is_deterministic() {
    let catalog = FileCatalog::from_json(CATALOG).unwrap();
    let request = DeploymentRequest::from_toml(REQUEST).unwrap();
    let ctx = context();

    let render = || {
        let (_, runtime) = ctx.render(&catalog, &request, RuntimeTarget::Local).unwrap();
        let AiRuntimeConfig::Local(local) = runtime else {
            panic!("expected local runtime config");
        };
        (local.compose.to_yaml().unwrap(), local.gateway.to_yaml().unwrap())
    };

    assert_eq!(render(), render());
}

// =============================================================================
// Cluster translation
// =============================================================================

#[test]
fn cluster_render_emits_one_resource_per_entity() {
    let catalog = FileCatalog::from_json(CATALOG).unwrap();
    let request = DeploymentRequest::from_toml(REQUEST).unwrap();

    let (_, runtime) = context().render(&catalog, &request, RuntimeTarget::Cluster).unwrap();
    let AiRuntimeConfig::Cluster(manifests) = runtime else {
        panic!("expected cluster manifests");
    };

    assert_eq!(manifests.agents.len(), 1);
    assert_eq!(manifests.config_maps.len(), 1);
    assert_eq!(manifests.mcp_servers.len(), 1);
    assert_eq!(manifests.remote_mcp_servers.len(), 1);

    let yaml = manifests.to_yaml().unwrap();
    assert_eq!(yaml.matches("---\n").count(), manifests.len());
    let config_map = yaml.find("kind: ConfigMap").unwrap();
    let agent = yaml.find("kind: Agent").unwrap();
    let remote = yaml.find("kind: RemoteMCPServer").unwrap();
    assert!(config_map < agent && agent < remote);
}
