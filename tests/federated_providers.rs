//! Federated verifiers talking to a local mock provider
mod common;

use authgate::auth::config::OAuthConfig;
use authgate::auth::identity::EmailRecord;
use authgate::auth::providers::github::GithubVerifier;
use authgate::auth::providers::google::GoogleVerifier;
use authgate::auth::{AuthError, Presented, Verifier};
use common::mock_provider::MockProvider;

fn github(provider: &MockProvider) -> GithubVerifier {
    let config = OAuthConfig {
        enabled: true,
        client_id: "github-client".to_string(),
        client_secret: "github-secret".to_string(),
        redirect_url: None,
        auth_url: None,
        token_url: Some(provider.url("/github/token")),
        userinfo_url: Some(provider.url("/github/user")),
    };
    GithubVerifier::new(config, "http://wiki.test/auth/github/callback".to_string()).unwrap()
}

fn google(provider: &MockProvider) -> GoogleVerifier {
    let config = OAuthConfig {
        enabled: true,
        client_id: "google-client".to_string(),
        client_secret: "google-secret".to_string(),
        redirect_url: None,
        auth_url: None,
        token_url: Some(provider.url("/google/token")),
        userinfo_url: Some(provider.url("/google/userinfo")),
    };
    GoogleVerifier::new(config, "http://wiki.test/oauth2callback".to_string()).unwrap()
}

fn callback(code: &str) -> Presented {
    Presented::Callback {
        code: code.to_string(),
    }
}

#[tokio::test]
async fn test_github_profile_mapping() {
    let provider = MockProvider::start().await.unwrap();
    let verifier = github(&provider);

    let raw = verifier.verify(callback("member")).await.unwrap();
    assert_eq!(raw.display_name.as_deref(), Some("The Octocat"));
    assert_eq!(raw.username.as_deref(), Some("octocat"));
    assert_eq!(
        raw.emails,
        vec![EmailRecord {
            value: "octo@example.org".to_string()
        }]
    );

    let identity = verifier.verify(callback("noemail")).await.unwrap().normalize();
    assert_eq!(identity.display_name, "ghost");
    assert!(!identity.has_email());

    provider.shutdown().await;
}

#[tokio::test]
async fn test_github_token_error_field() {
    let provider = MockProvider::start().await.unwrap();
    let verifier = github(&provider);

    let err = verifier.verify(callback("bogus")).await.unwrap_err();
    match err {
        AuthError::ProviderError(message) => assert!(message.contains("bad_verification_code")),
        other => panic!("unexpected error: {:?}", other),
    }

    provider.shutdown().await;
}

#[tokio::test]
async fn test_github_wrong_redirect_uri_is_rejected() {
    let provider = MockProvider::start().await.unwrap();
    let config = OAuthConfig {
        enabled: true,
        client_id: "github-client".to_string(),
        client_secret: "github-secret".to_string(),
        redirect_url: Some("http://wiki.test/elsewhere".to_string()),
        auth_url: None,
        token_url: Some(provider.url("/github/token")),
        userinfo_url: Some(provider.url("/github/user")),
    };
    let verifier =
        GithubVerifier::new(config, "http://wiki.test/auth/github/callback".to_string()).unwrap();

    assert!(verifier.verify(callback("member")).await.is_err());

    provider.shutdown().await;
}

#[tokio::test]
async fn test_google_profile_mapping() {
    let provider = MockProvider::start().await.unwrap();
    let verifier = google(&provider);

    let identity = verifier.verify(callback("member")).await.unwrap().normalize();
    assert_eq!(identity.display_name, "Jane Member");
    assert_eq!(identity.email, "jane@example.org");
    assert_eq!(identity.author_alias, "Jane Member <jane@example.org>");

    provider.shutdown().await;
}

#[tokio::test]
async fn test_google_token_failure_status() {
    let provider = MockProvider::start().await.unwrap();
    let verifier = google(&provider);

    let err = verifier.verify(callback("bogus")).await.unwrap_err();
    match err {
        AuthError::ProviderError(message) => assert!(message.contains("400")),
        other => panic!("unexpected error: {:?}", other),
    }

    provider.shutdown().await;
}

#[tokio::test]
async fn test_password_presentation_is_refused() {
    let provider = MockProvider::start().await.unwrap();

    let presented = Presented::Password {
        username: "octocat".to_string(),
        password: "hunter2".to_string(),
    };
    assert!(matches!(
        github(&provider).verify(presented.clone()).await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        google(&provider).verify(presented).await,
        Err(AuthError::InvalidCredentials)
    ));

    provider.shutdown().await;
}
