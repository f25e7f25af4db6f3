use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use service::auth::domain::{LoginInput, RegisterInput, TokenKind};
use service::auth::repository::mock::MockAuthRepository;
use service::auth::{AuthConfig, AuthService};
use service::mail::LogMailer;

fn bench_tokens(c: &mut Criterion) {
    let repo = Arc::new(MockAuthRepository::default());
    let svc = AuthService::new(repo.clone(), Arc::new(LogMailer::new("bench@shop.example", false)), AuthConfig::new("secret"));

    // register and confirm outside of the measured loop
    let rt = tokio::runtime::Runtime::new().unwrap();
    let user = rt
        .block_on(svc.register(RegisterInput {
            email: "bench@example.com".into(),
            first_name: "Bench".into(),
            last_name: "Mark".into(),
            phone_no: "9876543210".into(),
            dob: None,
            gender: None,
            password: "Benchmark1".into(),
        }))
        .unwrap();
    repo.confirm_all(user.id);

    c.bench_function("auth_login_verify", |b| {
        b.iter(|| {
            let input = LoginInput { email: "bench@example.com".into(), password: "Benchmark1".into(), session_type: None };
            rt.block_on(svc.login(input, "127.0.0.1")).unwrap()
        });
    });

    let token = svc.issue_token(user.id, TokenKind::Access, true).unwrap();
    c.bench_function("jwt_verify_access", |b| {
        b.iter(|| svc.verify_token(&token, TokenKind::Access).unwrap());
    });
}

criterion_group!(benches, bench_tokens);
criterion_main!(benches);
