//! End-to-end MFA flow tests: login → challenge → verify → tokens.
//!
//! Covers method selection, single consumption of challenges and backup
//! codes, lockout independence across verification paths, and
//! trusted-device bypass.

use chrono::Duration;
use keystone_auth::crypto;
use keystone_auth::mocks::{
    MockAttemptStore, MockAuditSink, MockBackupCodeStore, MockChallengeStore, MockClock,
    MockNotifier, MockRefreshTokenStore, MockTrustedDeviceStore, MockUserDirectory,
};
use keystone_auth::providers::{Clock, User};
use keystone_auth::{
    AccessTokenSigner, AttemptTracker, AuthConfig, AuthOutcome, ChallengeOrchestrator,
    FailureReason, MfaMethod, SessionFacade, TokenRotationEngine, TrustedDeviceRegistry, UserId,
    totp,
};
use std::net::IpAddr;

const PASSWORD: &str = "correct horse battery staple";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0)";
const TOTP_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

type TestFacade = SessionFacade<
    MockUserDirectory,
    MockRefreshTokenStore,
    MockChallengeStore,
    MockBackupCodeStore,
    MockAttemptStore,
    MockTrustedDeviceStore,
    MockNotifier,
    MockClock,
    MockAuditSink,
>;

struct Harness {
    facade: TestFacade,
    directory: MockUserDirectory,
    clock: MockClock,
    notifier: MockNotifier,
    backup_codes: MockBackupCodeStore,
}

fn harness(config: AuthConfig) -> Harness {
    let directory = MockUserDirectory::new();
    let clock = MockClock::new();
    let audit = MockAuditSink::new();
    let notifier = MockNotifier::new();
    let backup_codes = MockBackupCodeStore::new();

    let rotation = TokenRotationEngine::new(
        MockRefreshTokenStore::new(),
        clock.clone(),
        audit.clone(),
        AccessTokenSigner::new(b"mfa-integration-secret", &config),
        config.clone(),
    );
    let orchestrator = ChallengeOrchestrator::new(
        directory.clone(),
        MockChallengeStore::new(),
        backup_codes.clone(),
        AttemptTracker::new(MockAttemptStore::new(), clock.clone(), config.clone()),
        TrustedDeviceRegistry::new(
            MockTrustedDeviceStore::new(),
            clock.clone(),
            audit.clone(),
            config.clone(),
        ),
        notifier.clone(),
        clock.clone(),
        audit.clone(),
        config,
    );
    let facade = SessionFacade::new(
        directory.clone(),
        rotation,
        orchestrator,
        clock.clone(),
        audit.clone(),
    );

    Harness { facade, directory, clock, notifier, backup_codes }
}

fn mfa_user(totp_secret: Option<&str>) -> User {
    User {
        user_id: UserId::new(),
        email: "ada@example.com".to_string(),
        username: "ada".to_string(),
        is_active: true,
        mfa_enabled: true,
        totp_secret: totp_secret.map(str::to_string),
        requires_password_change: false,
        created_at: chrono::Utc::now(),
    }
}

fn ip() -> IpAddr {
    "203.0.113.7".parse().unwrap()
}

fn current_totp(h: &Harness) -> String {
    let counter = u64::try_from(h.clock.now().timestamp()).unwrap() / 30;
    totp::code_at(TOTP_SECRET, counter, 6).unwrap()
}

async fn login(h: &Harness, device_token: Option<&str>) -> AuthOutcome {
    h.facade
        .login("ada", PASSWORD, ip(), USER_AGENT, device_token)
        .await
        .unwrap()
}

fn expect_challenge(outcome: AuthOutcome) -> keystone_auth::ChallengeIssued {
    match outcome {
        AuthOutcome::MfaRequired(challenge) => challenge,
        other => panic!("expected an MFA challenge, got {other:?}"),
    }
}

#[tokio::test]
async fn login_without_mfa_succeeds_directly() {
    let h = harness(AuthConfig::default());
    h.directory.add_user(
        User { mfa_enabled: false, ..mfa_user(None) },
        PASSWORD,
    );

    match login(&h, None).await {
        AuthOutcome::Success { tokens, trusted_device_token, .. } => {
            assert!(!tokens.access_token.is_empty());
            assert!(!tokens.refresh_token.is_empty());
            assert!(trusted_device_token.is_none());
        }
        other => panic!("expected immediate success, got {other:?}"),
    }
    assert!(h.notifier.sent().is_empty(), "no challenge, no code dispatch");
}

#[tokio::test]
async fn unknown_user_and_wrong_password_are_indistinguishable() {
    let h = harness(AuthConfig::default());
    h.directory.add_user(mfa_user(None), PASSWORD);

    let unknown = h
        .facade
        .login("nobody", PASSWORD, ip(), USER_AGENT, None)
        .await
        .unwrap();
    let wrong = h
        .facade
        .login("ada", "wrong password", ip(), USER_AGENT, None)
        .await
        .unwrap();

    assert_eq!(unknown, AuthOutcome::Failed(FailureReason::InvalidCredentials));
    assert_eq!(wrong, AuthOutcome::Failed(FailureReason::InvalidCredentials));
}

#[tokio::test]
async fn inactive_account_cannot_login() {
    let h = harness(AuthConfig::default());
    h.directory.add_user(User { is_active: false, ..mfa_user(None) }, PASSWORD);

    assert_eq!(
        login(&h, None).await,
        AuthOutcome::Failed(FailureReason::AccountInactive)
    );
}

#[tokio::test]
async fn email_challenge_round_trip_and_single_consumption() {
    let h = harness(AuthConfig::default());
    h.directory.add_user(mfa_user(None), PASSWORD);

    let challenge = expect_challenge(login(&h, None).await);
    assert_eq!(challenge.method, MfaMethod::EmailCode);
    assert_eq!(challenge.allowed_methods, vec![MfaMethod::EmailCode]);

    let code = h.notifier.last_code().unwrap();
    let sent = &h.notifier.sent()[0];
    assert_eq!(sent.email, "ada@example.com");
    assert_eq!(sent.expires_in_minutes, 5);

    let outcome = h
        .facade
        .verify_challenge(
            &challenge.challenge_token,
            MfaMethod::EmailCode,
            &code,
            false,
            ip(),
            USER_AGENT,
        )
        .await
        .unwrap();
    assert!(outcome.is_success(), "correct emailed code must authenticate");

    // The same challenge with the same correct code is spent.
    assert_eq!(
        h.facade
            .verify_challenge(
                &challenge.challenge_token,
                MfaMethod::EmailCode,
                &code,
                false,
                ip(),
                USER_AGENT,
            )
            .await
            .unwrap(),
        AuthOutcome::Failed(FailureReason::InvalidOrExpiredToken)
    );
}

#[tokio::test]
async fn wrong_email_code_is_rejected_and_challenge_survives() {
    let h = harness(AuthConfig::default());
    h.directory.add_user(mfa_user(None), PASSWORD);

    let challenge = expect_challenge(login(&h, None).await);
    let code = h.notifier.last_code().unwrap();

    assert_eq!(
        h.facade
            .verify_challenge(
                &challenge.challenge_token,
                MfaMethod::EmailCode,
                "000000",
                false,
                ip(),
                USER_AGENT,
            )
            .await
            .unwrap(),
        AuthOutcome::Failed(FailureReason::InvalidCode)
    );

    // The state machine allows a retry against the same challenge.
    assert!(
        h.facade
            .verify_challenge(
                &challenge.challenge_token,
                MfaMethod::EmailCode,
                &code,
                false,
                ip(),
                USER_AGENT,
            )
            .await
            .unwrap()
            .is_success()
    );
}

#[tokio::test]
async fn expired_challenge_is_rejected() {
    let h = harness(AuthConfig::default());
    h.directory.add_user(mfa_user(None), PASSWORD);

    let challenge = expect_challenge(login(&h, None).await);
    let code = h.notifier.last_code().unwrap();

    h.clock.advance(Duration::minutes(6));
    assert_eq!(
        h.facade
            .verify_challenge(
                &challenge.challenge_token,
                MfaMethod::EmailCode,
                &code,
                false,
                ip(),
                USER_AGENT,
            )
            .await
            .unwrap(),
        AuthOutcome::Failed(FailureReason::InvalidOrExpiredToken)
    );
}

#[tokio::test]
async fn totp_is_preferred_over_email_when_enrolled() {
    let h = harness(AuthConfig::default());
    h.directory.add_user(mfa_user(Some(TOTP_SECRET)), PASSWORD);

    let challenge = expect_challenge(login(&h, None).await);
    assert_eq!(challenge.method, MfaMethod::Totp);
    assert_eq!(
        challenge.allowed_methods,
        vec![MfaMethod::Totp, MfaMethod::EmailCode]
    );
    assert!(h.notifier.sent().is_empty(), "TOTP challenges dispatch nothing");

    let code = current_totp(&h);
    assert!(
        h.facade
            .verify_challenge(
                &challenge.challenge_token,
                MfaMethod::Totp,
                &code,
                false,
                ip(),
                USER_AGENT,
            )
            .await
            .unwrap()
            .is_success()
    );
}

#[tokio::test]
async fn totp_outside_drift_window_is_rejected() {
    let h = harness(AuthConfig::default());
    h.directory.add_user(mfa_user(Some(TOTP_SECRET)), PASSWORD);

    let challenge = expect_challenge(login(&h, None).await);

    // A code from three steps ago is outside the ±1 window.
    let counter = u64::try_from(h.clock.now().timestamp()).unwrap() / 30 - 3;
    let stale = totp::code_at(TOTP_SECRET, counter, 6).unwrap();

    assert_eq!(
        h.facade
            .verify_challenge(
                &challenge.challenge_token,
                MfaMethod::Totp,
                &stale,
                false,
                ip(),
                USER_AGENT,
            )
            .await
            .unwrap(),
        AuthOutcome::Failed(FailureReason::InvalidCode)
    );
}

#[tokio::test]
async fn email_verification_against_totp_challenge_is_rejected() {
    let h = harness(AuthConfig::default());
    h.directory.add_user(mfa_user(Some(TOTP_SECRET)), PASSWORD);

    let challenge = expect_challenge(login(&h, None).await);

    // No code was dispatched for a TOTP challenge, so the email path has
    // nothing to verify against.
    assert_eq!(
        h.facade
            .verify_challenge(
                &challenge.challenge_token,
                MfaMethod::EmailCode,
                "123456",
                false,
                ip(),
                USER_AGENT,
            )
            .await
            .unwrap(),
        AuthOutcome::Failed(FailureReason::InvalidOrExpiredToken)
    );
}

#[tokio::test]
async fn lockout_on_totp_leaves_backup_codes_usable() {
    let config = AuthConfig::default().with_max_failed_attempts(3);
    let h = harness(config);
    let user = mfa_user(Some(TOTP_SECRET));
    let user_id = user.user_id;
    h.directory.add_user(user, PASSWORD);

    let backup_code = "recovery-0001";
    h.backup_codes.seed(user_id, [crypto::hash_secret(backup_code)]);

    let challenge = expect_challenge(login(&h, None).await);
    assert!(challenge.allowed_methods.contains(&MfaMethod::BackupCode));

    // Exhaust the TOTP path.
    for _ in 0..3 {
        assert_eq!(
            h.facade
                .verify_challenge(
                    &challenge.challenge_token,
                    MfaMethod::Totp,
                    "000000",
                    false,
                    ip(),
                    USER_AGENT,
                )
                .await
                .unwrap(),
            AuthOutcome::Failed(FailureReason::InvalidCode)
        );
    }
    assert_eq!(
        h.facade
            .verify_challenge(
                &challenge.challenge_token,
                MfaMethod::Totp,
                &current_totp(&h),
                false,
                ip(),
                USER_AGENT,
            )
            .await
            .unwrap(),
        AuthOutcome::Failed(FailureReason::TooManyAttempts),
        "even the correct TOTP is refused once locked"
    );

    // The backup-code path is its own counter and still works.
    assert!(
        h.facade
            .verify_challenge(
                &challenge.challenge_token,
                MfaMethod::BackupCode,
                backup_code,
                false,
                ip(),
                USER_AGENT,
            )
            .await
            .unwrap()
            .is_success()
    );
}

#[tokio::test]
async fn backup_code_validates_at_most_once() {
    let h = harness(AuthConfig::default());
    let user = mfa_user(None);
    let user_id = user.user_id;
    h.directory.add_user(user, PASSWORD);

    let backup_code = "recovery-0001";
    h.backup_codes.seed(user_id, [crypto::hash_secret(backup_code)]);

    let challenge = expect_challenge(login(&h, None).await);
    assert!(
        h.facade
            .verify_challenge(
                &challenge.challenge_token,
                MfaMethod::BackupCode,
                backup_code,
                false,
                ip(),
                USER_AGENT,
            )
            .await
            .unwrap()
            .is_success()
    );

    // A fresh login, a fresh challenge — but the code is spent for good.
    let second = expect_challenge(login(&h, None).await);
    assert_eq!(
        h.facade
            .verify_challenge(
                &second.challenge_token,
                MfaMethod::BackupCode,
                backup_code,
                false,
                ip(),
                USER_AGENT,
            )
            .await
            .unwrap(),
        AuthOutcome::Failed(FailureReason::InvalidCode)
    );
}

#[tokio::test]
async fn trusted_device_skips_the_challenge() {
    let h = harness(AuthConfig::default());
    h.directory.add_user(mfa_user(None), PASSWORD);

    let challenge = expect_challenge(login(&h, None).await);
    let code = h.notifier.last_code().unwrap();

    let device_token = match h
        .facade
        .verify_challenge(
            &challenge.challenge_token,
            MfaMethod::EmailCode,
            &code,
            true,
            ip(),
            USER_AGENT,
        )
        .await
        .unwrap()
    {
        AuthOutcome::Success { trusted_device_token: Some(token), .. } => token,
        other => panic!("expected success with a device token, got {other:?}"),
    };

    // Next login from the same device profile bypasses MFA entirely.
    match login(&h, Some(&device_token)).await {
        AuthOutcome::Success { trusted_device_token, .. } => {
            assert!(trusted_device_token.is_none());
        }
        other => panic!("expected trusted-device bypass, got {other:?}"),
    }
}

#[tokio::test]
async fn trusted_device_fails_closed_from_another_network() {
    let h = harness(AuthConfig::default());
    h.directory.add_user(mfa_user(None), PASSWORD);

    let challenge = expect_challenge(login(&h, None).await);
    let code = h.notifier.last_code().unwrap();
    let device_token = match h
        .facade
        .verify_challenge(
            &challenge.challenge_token,
            MfaMethod::EmailCode,
            &code,
            true,
            ip(),
            USER_AGENT,
        )
        .await
        .unwrap()
    {
        AuthOutcome::Success { trusted_device_token: Some(token), .. } => token,
        other => panic!("expected success with a device token, got {other:?}"),
    };

    // The stolen cookie shows up from a different network: challenge again.
    let other_ip: IpAddr = "198.51.100.50".parse().unwrap();
    let outcome = h
        .facade
        .login("ada", PASSWORD, other_ip, USER_AGENT, Some(&device_token))
        .await
        .unwrap();
    assert!(
        matches!(outcome, AuthOutcome::MfaRequired(_)),
        "fingerprint mismatch must not bypass MFA"
    );
}

#[tokio::test]
async fn expired_trusted_device_challenges_again() {
    let h = harness(AuthConfig::default());
    h.directory.add_user(mfa_user(None), PASSWORD);

    let challenge = expect_challenge(login(&h, None).await);
    let code = h.notifier.last_code().unwrap();
    let device_token = match h
        .facade
        .verify_challenge(
            &challenge.challenge_token,
            MfaMethod::EmailCode,
            &code,
            true,
            ip(),
            USER_AGENT,
        )
        .await
        .unwrap()
    {
        AuthOutcome::Success { trusted_device_token: Some(token), .. } => token,
        other => panic!("expected success with a device token, got {other:?}"),
    };

    h.clock.advance(Duration::days(31));
    let outcome = login(&h, Some(&device_token)).await;
    assert!(matches!(outcome, AuthOutcome::MfaRequired(_)));
}

#[tokio::test]
async fn password_lockout_blocks_even_correct_password() {
    let config = AuthConfig::default().with_max_failed_attempts(3);
    let h = harness(config);
    h.directory.add_user(mfa_user(None), PASSWORD);

    for _ in 0..3 {
        assert_eq!(
            h.facade
                .login("ada", "wrong password", ip(), USER_AGENT, None)
                .await
                .unwrap(),
            AuthOutcome::Failed(FailureReason::InvalidCredentials)
        );
    }

    assert_eq!(
        login(&h, None).await,
        AuthOutcome::Failed(FailureReason::TooManyAttempts)
    );

    // The lock clears on its own.
    h.clock.advance(Duration::minutes(16));
    assert!(matches!(login(&h, None).await, AuthOutcome::MfaRequired(_)));
}

#[tokio::test]
async fn notifier_failure_does_not_block_challenge_issuance() {
    let h = harness(AuthConfig::default());
    h.directory.add_user(mfa_user(None), PASSWORD);
    h.notifier.set_failing(true);

    let outcome = login(&h, None).await;
    assert!(
        matches!(outcome, AuthOutcome::MfaRequired(_)),
        "a dead mail relay must not turn into a login denial"
    );
}

#[tokio::test]
async fn mfa_can_be_mandated_globally() {
    let config = AuthConfig::default().with_mfa_required_for_all(true);
    let h = harness(config);
    h.directory.add_user(User { mfa_enabled: false, ..mfa_user(None) }, PASSWORD);

    assert!(matches!(login(&h, None).await, AuthOutcome::MfaRequired(_)));
}

#[tokio::test]
async fn concurrent_correct_verifications_issue_one_session() {
    let h = harness(AuthConfig::default());
    h.directory.add_user(mfa_user(None), PASSWORD);

    let challenge = expect_challenge(login(&h, None).await);
    let code = h.notifier.last_code().unwrap();

    let facade = std::sync::Arc::new(h.facade);
    let mut handles = Vec::new();
    for _ in 0..4 {
        let facade = std::sync::Arc::clone(&facade);
        let token = challenge.challenge_token.clone();
        let code = code.clone();
        handles.push(tokio::spawn(async move {
            facade
                .verify_challenge(&token, MfaMethod::EmailCode, &code, false, ip(), USER_AGENT)
                .await
                .unwrap()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            AuthOutcome::Success { .. } => successes += 1,
            AuthOutcome::Failed(FailureReason::InvalidOrExpiredToken) => {}
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(successes, 1, "a challenge authorizes exactly one session");
}
