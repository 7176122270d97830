//! Benchmarks for head pose estimation and gaze classification

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use proctor::pose::{euler_to_rotation, project_head, rotation_to_euler};
use proctor::{CalibrationBaseline, GazeDeviationClassifier, HeadPoseAngles, HeadPoseEstimator, LandmarkSet};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

fn projected_landmarks(angles: &HeadPoseAngles) -> LandmarkSet {
    project_head(angles, 1500.0, WIDTH, HEIGHT).expect("head in front of camera")
}

fn benchmark_pose_estimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pose_estimation");
    let estimator = HeadPoseEstimator::default();

    let frontal = projected_landmarks(&HeadPoseAngles::default());
    group.bench_function("estimate_frontal", |b| {
        b.iter(|| black_box(estimator.estimate(black_box(&frontal), WIDTH, HEIGHT)));
    });

    let turned = projected_landmarks(&HeadPoseAngles::new(15.0, -35.0, 5.0));
    group.bench_function("estimate_turned", |b| {
        b.iter(|| black_box(estimator.estimate(black_box(&turned), WIDTH, HEIGHT)));
    });

    let rotation = euler_to_rotation(&HeadPoseAngles::new(10.0, 20.0, -5.0));
    group.bench_function("rotation_to_euler", |b| {
        b.iter(|| black_box(rotation_to_euler(black_box(&rotation))));
    });

    group.finish();
}

fn benchmark_gaze(c: &mut Criterion) {
    let classifier = GazeDeviationClassifier::default();
    let baseline = CalibrationBaseline::new(-3.0, 4.0);
    let pose = HeadPoseAngles::new(18.0, 41.0, 0.0);

    c.bench_function("gaze_assess", |b| {
        b.iter(|| black_box(classifier.assess_pose(black_box(&pose), black_box(&baseline))));
    });
}

criterion_group!(benches, benchmark_pose_estimation, benchmark_gaze);
criterion_main!(benches);
