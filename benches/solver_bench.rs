use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mediflow::models::RosterConfig;
use mediflow::roster::{self, build, BranchAndBound, RosterSolver, SolveOptions};

fn bench_solver(c: &mut Criterion) {
    let config = RosterConfig::default();
    let problem = build(&config).expect("default roster should build");
    let solver = BranchAndBound::default();
    let options = SolveOptions::default();

    c.bench_function("solve_default_clinic", |b| {
        b.iter(|| black_box(solver.solve(&problem, &options)));
    });
    c.bench_function("build_default_clinic", |b| {
        b.iter(|| black_box(build(&config).expect("default roster should build")));
    });
    c.bench_function("analyze_default_clinic", |b| {
        b.iter(|| black_box(roster::analyze(&config).expect("analysis should run")));
    });
}

criterion_group!(benches, bench_solver);
criterion_main!(benches);
