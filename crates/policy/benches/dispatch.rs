use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use warden_core::{AccessState, AccessUri, AppId, Decision, PackageState, Uid, UserId};
use warden_policy::AccessPolicy;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const FIRST_APP_ID: u32 = 10_000;

fn make_package(i: u32) -> PackageState {
    // Every fourth package shares the previous app-id.
    let app_id = FIRST_APP_ID + i - u32::from(i % 4 == 3);
    PackageState::new(format!("com.example.app{i}"), AppId(app_id))
        .with_permissions(["CAMERA", "RECORD_AUDIO", "ACCESS_FINE_LOCATION"])
}

fn populated_state(policy: &AccessPolicy, users: u32, packages: u32) -> AccessState {
    let old = AccessState::new();
    let mut new = old.next_version();
    for user in 0..users {
        policy.on_user_added(UserId(user * 10), &old, &mut new);
    }
    for i in 0..packages {
        policy.on_package_added(&make_package(i), &old, &mut new);
    }
    for user in 0..users {
        for i in (0..packages).step_by(2) {
            let uid =
                AccessUri::Uid(Uid::new(UserId(user * 10), AppId(FIRST_APP_ID + i)).unwrap());
            policy.set_decision(
                &uid,
                &AccessUri::permission("CAMERA"),
                Decision::Granted,
                &old,
                &mut new,
            );
        }
    }
    new
}

// ---------------------------------------------------------------------------
// Benchmark: decision lookup
// ---------------------------------------------------------------------------

fn bench_get_decision(c: &mut Criterion) {
    let policy = AccessPolicy::with_default_policies();

    let mut group = c.benchmark_group("get_decision");
    for packages in [10, 100, 1000] {
        let state = populated_state(&policy, 4, packages);
        let uid = AccessUri::Uid(Uid::new(UserId(10), AppId(FIRST_APP_ID + 2)).unwrap());
        let camera = AccessUri::permission("CAMERA");
        group.bench_with_input(BenchmarkId::from_parameter(packages), &state, |b, state| {
            b.iter(|| policy.get_decision(black_box(&uid), black_box(&camera), state));
        });
    }
    group.finish();

    let state = populated_state(&policy, 4, 100);
    let subject = AccessUri::Package("com.example.app1".into());
    let object = AccessUri::permission("CAMERA");
    c.bench_function("get_decision_unroutable", |b| {
        b.iter(|| policy.get_decision(black_box(&subject), black_box(&object), &state));
    });
}

// ---------------------------------------------------------------------------
// Benchmark: package lifecycle
// ---------------------------------------------------------------------------

fn bench_package_lifecycle(c: &mut Criterion) {
    let policy = AccessPolicy::with_default_policies();

    let mut group = c.benchmark_group("package_add_remove");
    for packages in [10, 100, 1000] {
        let state = populated_state(&policy, 4, packages);
        let pkg = make_package(packages + 1);
        group.bench_with_input(BenchmarkId::from_parameter(packages), &state, |b, state| {
            b.iter(|| {
                let mut added = state.next_version();
                policy.on_package_added(black_box(&pkg), state, &mut added);
                let mut removed = added.next_version();
                policy.on_package_removed(black_box(&pkg), &added, &mut removed);
                removed
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_get_decision, bench_package_lifecycle);
criterion_main!(benches);
