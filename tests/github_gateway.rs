//! Integration tests for the Octocrab gateway against a mock GitHub API.
//!
//! Each test starts a `wiremock` server, points the gateway at it, and checks
//! how answers and failures come back from a single unguarded request.

use http::StatusCode;
use pullgate::github::{
    AccessToken, GitHubError, GitHubGateway, OctocrabGateway, PullRequestNumber,
    PullRequestReference, RateLimitInfo, RepositoryName, RepositoryOwner,
};
use rstest::rstest;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPOSITORY_PATH: &str = "/repos/octo/widgets";

fn owner() -> RepositoryOwner {
    RepositoryOwner::new("octo").expect("owner should be valid")
}

fn repo() -> RepositoryName {
    RepositoryName::new("widgets").expect("repository should be valid")
}

fn reference() -> PullRequestReference {
    PullRequestReference::new(
        owner(),
        repo(),
        PullRequestNumber::new(7).expect("number should be valid"),
    )
}

fn anonymous_gateway(server: &MockServer) -> OctocrabGateway {
    OctocrabGateway::for_token(None, &server.uri()).expect("gateway should build")
}

fn with_quota(template: ResponseTemplate, remaining: &str) -> ResponseTemplate {
    template
        .insert_header("x-ratelimit-limit", "5000")
        .insert_header("x-ratelimit-remaining", remaining)
        .insert_header("x-ratelimit-reset", "1760000000")
}

async fn mount_repository_answer(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(REPOSITORY_PATH))
        .respond_with(template)
        .mount(server)
        .await;
}

fn repository_body(private: bool) -> Value {
    json!({
        "full_name": "octo/widgets",
        "private": private,
        "default_branch": "main",
        "html_url": "https://github.com/octo/widgets"
    })
}

#[tokio::test]
async fn repository_answer_carries_payload_and_quota() {
    let server = MockServer::start().await;
    mount_repository_answer(
        &server,
        with_quota(
            ResponseTemplate::new(200).set_body_json(repository_body(true)),
            "4999",
        ),
    )
    .await;

    let response = anonymous_gateway(&server)
        .repository(&owner(), &repo())
        .await
        .expect("repository should load");

    assert!(response.value.private);
    assert_eq!(response.value.full_name.as_deref(), Some("octo/widgets"));
    assert_eq!(
        response.rate_limit,
        Some(RateLimitInfo::new(5000, 4999, 1_760_000_000))
    );
}

#[tokio::test]
async fn answer_without_quota_headers_has_no_rate_limit() {
    let server = MockServer::start().await;
    mount_repository_answer(
        &server,
        ResponseTemplate::new(200).set_body_json(repository_body(false)),
    )
    .await;

    let response = anonymous_gateway(&server)
        .repository(&owner(), &repo())
        .await
        .expect("repository should load");

    assert!(!response.value.private);
    assert_eq!(response.rate_limit, None);
}

#[tokio::test]
async fn token_is_sent_as_bearer_authorisation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REPOSITORY_PATH))
        .and(header("authorization", "Bearer gho_secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(repository_body(true)))
        .expect(1)
        .mount(&server)
        .await;

    let token = AccessToken::new("gho_secret").expect("token should be valid");
    let gateway =
        OctocrabGateway::for_token(Some(&token), &server.uri()).expect("gateway should build");

    gateway
        .repository(&owner(), &repo())
        .await
        .expect("authorised request should succeed");
}

#[tokio::test]
async fn pull_request_and_reviews_are_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/pulls/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": 7,
            "title": "Add sprockets",
            "state": "open",
            "html_url": "https://github.com/octo/widgets/pull/7",
            "user": { "login": "octocat" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widgets/pulls/7/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "state": "APPROVED", "body": "ship it", "user": { "login": "alice" } },
            { "id": 2, "state": "COMMENTED", "body": null, "user": null }
        ])))
        .mount(&server)
        .await;

    let gateway = anonymous_gateway(&server);
    let pull_request = gateway
        .pull_request(&reference())
        .await
        .expect("pull request should load")
        .value;
    let reviews = gateway
        .pull_request_reviews(&reference())
        .await
        .expect("reviews should load")
        .value;

    assert!(pull_request.is_open());
    assert_eq!(pull_request.author.as_deref(), Some("octocat"));
    assert_eq!(reviews.len(), 2);
    assert_eq!(
        reviews.first().and_then(|review| review.author.as_deref()),
        Some("alice")
    );
    assert_eq!(reviews.get(1).and_then(|review| review.author.clone()), None);
}

#[tokio::test]
async fn reviews_are_collected_across_pages() {
    let server = MockServer::start().await;
    let reviews_path = "/repos/octo/widgets/pulls/7/reviews";
    let next_page = format!("<{}{reviews_path}?per_page=100&page=2>; rel=\"next\"", server.uri());
    Mock::given(method("GET"))
        .and(path(reviews_path))
        .and(query_param("page", "2"))
        .respond_with(with_quota(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": 2, "state": "COMMENTED", "user": { "login": "bob" } }])),
            "4998",
        ))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(reviews_path))
        .and(query_param("per_page", "100"))
        .respond_with(with_quota(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": 1, "state": "APPROVED", "user": { "login": "alice" } }]))
                .insert_header("link", next_page.as_str()),
            "4999",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let response = anonymous_gateway(&server)
        .pull_request_reviews(&reference())
        .await
        .expect("reviews should load");

    let ids: Vec<u64> = response.value.iter().map(|review| review.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(
        response.rate_limit,
        Some(RateLimitInfo::new(5000, 4998, 1_760_000_000))
    );
}

#[rstest]
#[case::unauthorised(401, "Bad credentials", "Authentication")]
#[case::forbidden(403, "Resource not accessible by integration", "Forbidden")]
#[case::primary_rate_limit(403, "API rate limit exceeded for 10.0.0.1.", "RateLimited")]
#[case::too_many_requests(429, "You have exceeded a secondary rate limit", "RateLimited")]
#[case::not_found(404, "Not Found", "NotFound")]
#[case::validation(422, "Validation Failed", "Validation")]
#[case::bad_gateway(502, "Server Error", "Server")]
#[case::bad_request(400, "Problems parsing JSON", "Api")]
#[tokio::test]
async fn failures_are_classified_by_status(
    #[case] status: u16,
    #[case] message: &str,
    #[case] expected: &str,
) {
    let server = MockServer::start().await;
    mount_repository_answer(
        &server,
        ResponseTemplate::new(status).set_body_json(json!({ "message": message })),
    )
    .await;

    let error = anonymous_gateway(&server)
        .repository(&owner(), &repo())
        .await
        .expect_err("request should fail");

    let kind = match &error {
        GitHubError::RateLimited { .. } => "RateLimited",
        GitHubError::Authentication { .. } => "Authentication",
        GitHubError::Forbidden { .. } => "Forbidden",
        GitHubError::NotFound { .. } => "NotFound",
        GitHubError::Validation { .. } => "Validation",
        GitHubError::Server { .. } => "Server",
        GitHubError::Api { .. } => "Api",
        other => panic!("unexpected classification: {other:?}"),
    };
    assert_eq!(kind, expected, "error was {error:?}");
    assert_eq!(
        error.status().map(|code| code.as_u16()),
        Some(status),
        "status should survive classification"
    );
    assert!(
        error.to_string().contains(message),
        "message should be preserved: {error}"
    );
}

#[tokio::test]
async fn forbidden_with_spent_quota_is_a_rate_limit_carrying_the_quota() {
    let server = MockServer::start().await;
    mount_repository_answer(
        &server,
        with_quota(
            ResponseTemplate::new(403).set_body_json(json!({ "message": "Forbidden" })),
            "0",
        ),
    )
    .await;

    let error = anonymous_gateway(&server)
        .repository(&owner(), &repo())
        .await
        .expect_err("request should fail");

    assert!(
        matches!(
            error,
            GitHubError::RateLimited {
                status: Some(StatusCode::FORBIDDEN),
                ..
            }
        ),
        "unexpected error: {error:?}"
    );
    assert_eq!(
        error.rate_limit(),
        Some(RateLimitInfo::new(5000, 0, 1_760_000_000))
    );
}

#[tokio::test]
async fn forbidden_pointing_at_rate_limit_docs_is_a_rate_limit() {
    let server = MockServer::start().await;
    mount_repository_answer(
        &server,
        ResponseTemplate::new(403).set_body_json(json!({
            "message": "You have triggered an abuse detection mechanism.",
            "documentation_url": "https://docs.github.com/rest/overview/rate-limits-for-the-rest-api"
        })),
    )
    .await;

    let error = anonymous_gateway(&server)
        .repository(&owner(), &repo())
        .await
        .expect_err("request should fail");

    assert!(error.indicates_rate_limit(), "unexpected error: {error:?}");
    assert!(error.is_retryable());
}

#[tokio::test]
async fn undecodable_success_body_is_an_api_error() {
    let server = MockServer::start().await;
    mount_repository_answer(
        &server,
        ResponseTemplate::new(200).set_body_string("not json"),
    )
    .await;

    let error = anonymous_gateway(&server)
        .repository(&owner(), &repo())
        .await
        .expect_err("decoding should fail");

    assert!(
        matches!(
            error,
            GitHubError::Api {
                status: Some(StatusCode::OK),
                ..
            }
        ),
        "unexpected error: {error:?}"
    );
    assert!(!error.is_retryable());
}

#[test]
fn unparseable_api_base_is_rejected() {
    let result = OctocrabGateway::for_token(None, "not a uri");

    assert!(matches!(result, Err(GitHubError::InvalidUrl(_))));
}
