use netmesh_common::{Database, ErrorKind, Network, NetworkPatch, ServerConfig, COMMS_NETWORK};
use netmesh_control::access_keys::decode_access_string;
use netmesh_control::{AccessKeyRequest, AuthorizedScope, ControlPlane, NetworkScope, Operation};

const MASTER: &str = "integration-master";

fn config() -> ServerConfig {
    ServerConfig {
        master_key: MASTER.to_string(),
        jwt_secret: "integration-jwt".to_string(),
        api_host: "api.netmesh.test".to_string(),
        ..Default::default()
    }
}

fn plane() -> ControlPlane {
    ControlPlane::with_database(&config(), Database::open_memory().unwrap()).unwrap()
}

async fn operator(cp: &ControlPlane) -> AuthorizedScope {
    cp.authorize(Operation::CreateNetwork, None, MASTER).await.unwrap()
}

async fn create(cp: &ControlPlane, net_id: &str, range: &str) -> Network {
    let scope = operator(cp).await;
    cp.create_network(
        &scope,
        Network {
            net_id: net_id.to_string(),
            address_range: range.to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap()
}

fn user_token(cp: &ControlPlane, scope: &AuthorizedScope, name: &str, networks: &[&str]) -> String {
    let networks: Vec<String> = networks.iter().map(|n| n.to_string()).collect();
    cp.issue_user_token(scope, name, &networks, false).unwrap()
}

/// Changing the IPv4 range moves every node into the new range.
#[tokio::test]
async fn range_change_reassigns_node_addresses() {
    let cp = plane();
    create(&cp, "net1", "10.0.0.0/24").await;

    let scope = cp
        .authorize(Operation::ManageNodes, Some("net1"), MASTER)
        .await
        .unwrap();
    cp.add_node(&scope, "net1", "alpha").await.unwrap();
    cp.add_node(&scope, "net1", "beta").await.unwrap();

    let patch = NetworkPatch {
        address_range: "10.0.1.0/24".to_string(),
        ..Default::default()
    };
    let updated = cp.update_network(&scope, "net1", &patch).await.unwrap();
    assert_eq!(updated.address_range, "10.0.1.0/24");

    let mut addresses: Vec<String> = cp
        .list_nodes(&scope, "net1")
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.address)
        .collect();
    addresses.sort();
    assert_eq!(addresses, vec!["10.0.1.1", "10.0.1.2"]);
    assert!(updated.nodes_last_modified > 0);
}

#[tokio::test]
async fn issue_key_with_generated_fields() {
    let cp = plane();
    create(&cp, "net1", "10.0.0.0/24").await;
    let scope = cp
        .authorize(Operation::CreateAccessKey, Some("net1"), MASTER)
        .await
        .unwrap();

    let key = cp
        .create_access_key(&scope, "net1", AccessKeyRequest::default())
        .await
        .unwrap();
    assert!(key.name.starts_with("key"));
    assert_eq!(key.name.len(), 8);
    assert_eq!(key.value.len(), 16);
    assert_eq!(key.uses, 1);

    let token = decode_access_string(&key.access_string).unwrap();
    assert_eq!(token.client_config.network, "net1");
    assert_eq!(token.client_config.local_range, "");
    assert_eq!(token.wireguard.grpc_wg_endpoint, "api.netmesh.test");
}

#[tokio::test]
async fn duplicate_and_missing_keys() {
    let cp = plane();
    create(&cp, "net1", "10.0.0.0/24").await;
    let scope = operator(&cp).await;

    let request = AccessKeyRequest {
        name: "laptop".to_string(),
        ..Default::default()
    };
    cp.create_access_key(&scope, "net1", request.clone()).await.unwrap();

    let err = cp.create_access_key(&scope, "net1", request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let before = cp.list_access_keys(&scope, "net1").await.unwrap();
    assert_eq!(before.len(), 1);

    let err = cp
        .delete_access_key(&scope, "net1", "ghost")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(cp.list_access_keys(&scope, "net1").await.unwrap(), before);

    cp.delete_access_key(&scope, "net1", "laptop").await.unwrap();
    assert!(cp.list_access_keys(&scope, "net1").await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_guarded_by_nodes() {
    let cp = plane();
    create(&cp, "net1", "10.0.0.0/24").await;
    let scope = operator(&cp).await;
    let node = cp.add_node(&scope, "net1", "alpha").await.unwrap();

    let err = cp.delete_network(&scope, "net1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(cp.get_network(&scope, "net1").await.is_ok());

    cp.remove_node(&scope, "net1", &node.id).await.unwrap();
    assert_eq!(cp.delete_network(&scope, "net1").await.unwrap(), 1);
    assert_eq!(
        cp.get_network(&scope, "net1").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn user_tokens_are_scoped() {
    let cp = plane();
    create(&cp, "net1", "10.0.0.0/24").await;
    create(&cp, "net2", "10.0.1.0/24").await;
    let admin = operator(&cp).await;
    let token = user_token(&cp, &admin, "alice", &["net1"]);

    let scope = cp
        .authorize(Operation::UpdateNetwork, Some("net1"), &token)
        .await
        .unwrap();
    assert_eq!(scope.identity, "alice");

    let err = cp
        .authorize(Operation::UpdateNetwork, Some("net2"), &token)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = cp
        .authorize(Operation::DeleteNetwork, Some("net1"), &token)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let listing = cp.authorize(Operation::ListNetworks, None, &token).await.unwrap();
    let names: Vec<String> = cp
        .list_networks(&listing)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.net_id)
        .collect();
    assert_eq!(names, vec!["net1"]);

    let err = cp.get_network(&scope, "net2").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(cp.issue_user_token(&scope, "mallory", &[], true).is_err());
}

#[tokio::test]
async fn user_without_grants_sees_nothing() {
    let cp = plane();
    create(&cp, "net1", "10.0.0.0/24").await;
    let admin = operator(&cp).await;
    let token = user_token(&cp, &admin, "bob", &[]);

    let scope = cp.authorize(Operation::ListNetworks, None, &token).await.unwrap();
    assert_eq!(scope.networks, NetworkScope::Denied);
    assert!(cp.list_networks(&scope).await.unwrap().is_empty());

    let err = cp
        .authorize(Operation::GetNetwork, Some("net1"), &token)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn missing_network_reported_before_credentials() {
    let cp = plane();
    let err = cp
        .authorize(Operation::GetNetwork, Some("ghost"), "bogus")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = cp
        .authorize(Operation::ListNetworks, None, "bogus")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCredential);
}

#[tokio::test]
async fn comms_network_is_hidden() {
    let cp = plane();
    create(&cp, COMMS_NETWORK, "10.200.0.0/24").await;
    create(&cp, "net1", "10.0.0.0/24").await;

    let scope = operator(&cp).await;
    let names: Vec<String> = cp
        .list_networks(&scope)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.net_id)
        .collect();
    assert_eq!(names, vec!["net1"]);
    assert!(cp.get_network(&scope, COMMS_NETWORK).await.is_ok());
}

#[tokio::test]
async fn node_limit_and_timestamps() {
    let cp = plane();
    let created = create(&cp, "net1", "10.0.0.0/24").await;
    let scope = operator(&cp).await;

    let limited = cp.update_node_limit(&scope, "net1", 1).await.unwrap();
    assert_eq!(limited.node_limit, 1);
    cp.add_node(&scope, "net1", "alpha").await.unwrap();
    let err = cp.add_node(&scope, "net1", "beta").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let keyed = cp.key_update(&scope, "net1").await.unwrap();
    assert!(keyed.key_update_timestamp > created.key_update_timestamp);

    let alerted = cp.alert_network(&scope, "net1").await.unwrap();
    assert!(alerted.network_last_modified > created.network_last_modified);
}

#[tokio::test]
async fn signup_token_carries_server_details() {
    let cp = plane();
    create(&cp, "net1", "10.0.0.0/24").await;
    let scope = operator(&cp).await;

    let key = cp.signup_token(&scope, "net1").await.unwrap();
    let token = decode_access_string(&key.access_string).unwrap();
    assert_eq!(token.server_config.api_host, "api.netmesh.test");
    assert!(token.client_config.key.is_empty());
}

#[tokio::test]
async fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        db_path: dir.path().join("netmesh.db"),
        ..config()
    };

    let cp = ControlPlane::open(&config).unwrap();
    create(&cp, "net1", "10.0.0.0/24").await;
    cp.shutdown().unwrap();

    let cp = ControlPlane::open(&config).unwrap();
    let scope = operator(&cp).await;
    let network = cp.get_network(&scope, "net1").await.unwrap();
    assert_eq!(network.address_range, "10.0.0.0/24");
    cp.shutdown().unwrap();
}
