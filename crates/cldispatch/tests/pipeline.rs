//! End-to-end pipeline tests against a real OpenCL runtime.
//!
//! Everything here needs at least one usable device, so the tests are ignored
//! by default; run them manually with `cargo test -- --ignored` on a machine
//! with an OpenCL runtime installed.

use cldispatch::{
    select_device, AccessMode, CompiledProgram, DeviceBuffer, DeviceClass, DispatchConfig,
    DispatchContext, DispatchError, KernelHandle, LaunchGeometry, ProgramSource, RangePlan,
    CPU_ONLY, GPU_ONLY, PREFER_GPU,
};

const REFLECT_KERNEL: &str = r#"
__kernel void vector_reflect(float4 x, float4 u, __global float4* result) {
    float scale = 2.0f * dot(x, u) / dot(u, u);
    *result = x - scale * u;
}
"#;

const WRITE_IDS_KERNEL: &str = r#"
__kernel void write_ids(__global int* out) {
    size_t id = get_global_id(0);
    out[id] = (int)id;
}
"#;

// Compiles only when the build options define TAG.
const OPTIONED_KERNEL: &str = r#"
__kernel void fill_tag(__global int* out) {
    out[0] = TAG;
}
"#;

fn any_device_context(profiling: bool) -> DispatchContext {
    DispatchContext::new(DispatchConfig {
        preference: PREFER_GPU.to_vec(),
        profiling,
        build_options: String::new(),
    })
    .expect("OpenCL runtime with a GPU or CPU device required")
}

#[test]
#[ignore = "requires an OpenCL runtime with a usable device"]
fn strict_gpu_selection_never_falls_back() {
    match select_device(GPU_ONLY) {
        Ok(selected) => assert_eq!(selected.info().class, DeviceClass::Gpu),
        Err(DispatchError::NoDevice { searched }) => assert_eq!(searched, "gpu"),
        Err(other) => panic!("unexpected selection error: {other}"),
    }
}

#[test]
#[ignore = "requires an OpenCL runtime with a usable device"]
fn ranked_preference_selects_gpu_first_then_cpu() {
    let gpu = select_device(GPU_ONLY);
    let cpu = select_device(CPU_ONLY);
    match select_device(PREFER_GPU) {
        Ok(selected) => {
            // The ranked list lands on the first class with hardware.
            if gpu.is_ok() {
                assert_eq!(selected.info().class, DeviceClass::Gpu);
            } else {
                assert!(cpu.is_ok(), "ranked selection found a device neither strict request did");
                assert_eq!(selected.info().class, DeviceClass::Cpu);
            }
        }
        Err(DispatchError::NoDevice { searched }) => {
            // The ranked list fails only when every rank does.
            assert!(gpu.is_err() && cpu.is_err());
            assert_eq!(searched, "gpu, cpu");
        }
        Err(other) => panic!("unexpected selection error: {other}"),
    }
}

#[test]
#[ignore = "requires an OpenCL runtime with a usable device"]
fn seeded_buffer_reads_back_identically() {
    let ctx = any_device_context(false);
    let seed: Vec<u32> = (0..257).collect();
    let buffer = DeviceBuffer::from_slice(&ctx, AccessMode::ReadOnly, &seed).unwrap();
    // No launch in between: the creation-time copy alone must account for
    // every byte.
    let host = buffer.read_blocking(ctx.queue(), None).unwrap();
    assert_eq!(host, seed);
}

#[test]
#[ignore = "requires an OpenCL runtime with a usable device"]
fn reflection_task_launch_end_to_end() {
    let ctx = any_device_context(false);
    let program = CompiledProgram::build(&ctx, ProgramSource::from(REFLECT_KERNEL)).unwrap();
    let kernel = KernelHandle::create(&program, "vector_reflect").unwrap();

    let out = DeviceBuffer::<f32>::new_uninit(&ctx, AccessMode::WriteOnly, 4).unwrap();
    let x = [1.0f32, 2.0, 3.0, 4.0];
    let u = [0.0f32, 5.0, 0.0, 0.0];
    kernel.bind_scalar(0, &x).unwrap();
    kernel.bind_scalar(1, &u).unwrap();
    kernel.bind_buffer(2, &out).unwrap();

    let done = kernel.launch(ctx.queue(), LaunchGeometry::task()).unwrap();
    let result = out.read_blocking(ctx.queue(), Some(&done)).unwrap();

    assert_eq!(result, vec![1.0, -2.0, 3.0, 4.0]);
}

#[test]
#[ignore = "requires an OpenCL runtime with a usable device"]
fn range_launch_covers_every_work_item() {
    let ctx = any_device_context(true);
    let program = CompiledProgram::build(&ctx, ProgramSource::from(WRITE_IDS_KERNEL)).unwrap();
    let kernel = KernelHandle::create(&program, "write_ids").unwrap();

    let geometry = LaunchGeometry::linear(64, 8).unwrap();
    let out = DeviceBuffer::<i32>::new_uninit(&ctx, AccessMode::WriteOnly, 64).unwrap();
    kernel.bind_buffer(0, &out).unwrap();

    let done = kernel.launch(ctx.queue(), geometry).unwrap();
    let result = out.read_blocking(ctx.queue(), Some(&done)).unwrap();

    let expected: Vec<i32> = (0..64).collect();
    assert_eq!(result, expected);
    // Profiling was on, so the completed event carries timestamps.
    assert!(done.elapsed_ms().is_some());
}

#[test]
#[ignore = "requires an OpenCL runtime with a usable device"]
fn range_plan_geometry_is_accepted_by_the_device() {
    let ctx = any_device_context(false);
    let plan = RangePlan::for_device(ctx.device_info(), 1 << 16).unwrap();

    let program = CompiledProgram::build(&ctx, ProgramSource::from(WRITE_IDS_KERNEL)).unwrap();
    let kernel = KernelHandle::create(&program, "write_ids").unwrap();
    let out =
        DeviceBuffer::<i32>::new_uninit(&ctx, AccessMode::WriteOnly, plan.geometry.global())
            .unwrap();
    kernel.bind_buffer(0, &out).unwrap();

    let done = kernel.launch(ctx.queue(), plan.geometry).unwrap();
    done.wait().unwrap();

    let result = out.read_blocking(ctx.queue(), None).unwrap();
    assert_eq!(result.len(), plan.geometry.global());
    assert_eq!(result.last().copied(), Some(plan.geometry.global() as i32 - 1));
}

#[test]
#[ignore = "requires an OpenCL runtime with a usable device"]
fn malformed_source_surfaces_a_build_log() {
    let ctx = any_device_context(false);
    let err = CompiledProgram::build(&ctx, ProgramSource::from("__kernel void broken( {"))
        .expect_err("a malformed kernel must not build");
    match err {
        DispatchError::BuildFailed { log } => {
            assert!(!log.trim().is_empty(), "the build log must never be empty");
        }
        other => panic!("expected BuildFailed, got: {other}"),
    }
}

#[test]
#[ignore = "requires an OpenCL runtime with a usable device"]
fn build_options_reach_the_kernel_compiler() {
    let ctx = DispatchContext::new(DispatchConfig {
        preference: PREFER_GPU.to_vec(),
        profiling: false,
        build_options: "-DTAG=7".to_string(),
    })
    .expect("OpenCL runtime with a GPU or CPU device required");

    let program = CompiledProgram::build(&ctx, ProgramSource::from(OPTIONED_KERNEL)).unwrap();
    let kernel = KernelHandle::create(&program, "fill_tag").unwrap();
    let out = DeviceBuffer::<i32>::new_uninit(&ctx, AccessMode::WriteOnly, 1).unwrap();
    kernel.bind_buffer(0, &out).unwrap();
    let done = kernel.launch(ctx.queue(), LaunchGeometry::task()).unwrap();
    let host = out.read_blocking(ctx.queue(), Some(&done)).unwrap();
    assert_eq!(host[0], 7);

    // The same source without the define must fail, with the log saying why.
    let bare = any_device_context(false);
    let err = CompiledProgram::build(&bare, ProgramSource::from(OPTIONED_KERNEL))
        .expect_err("TAG is undefined without the build option");
    assert!(matches!(err, DispatchError::BuildFailed { .. }));
}

#[test]
#[ignore = "requires an OpenCL runtime with a usable device"]
fn missing_entry_point_is_reported_by_name() {
    let ctx = any_device_context(false);
    let program = CompiledProgram::build(&ctx, ProgramSource::from(REFLECT_KERNEL)).unwrap();
    let err = KernelHandle::create(&program, "no_such_kernel")
        .expect_err("entry point does not exist");
    match err {
        DispatchError::KernelNotFound { name, .. } => assert_eq!(name, "no_such_kernel"),
        other => panic!("expected KernelNotFound, got: {other}"),
    }
}

#[test]
#[ignore = "requires an OpenCL runtime with a usable device"]
fn teardown_then_reinit_in_one_process() {
    // Two full create → use → drop cycles; the second must behave exactly
    // like the first.
    for run in 0..2 {
        let ctx = any_device_context(false);
        let seed = vec![run as f32; 16];
        let buffer = DeviceBuffer::from_slice(&ctx, AccessMode::ReadWrite, &seed).unwrap();
        let host = buffer.read_blocking(ctx.queue(), None).unwrap();
        assert_eq!(host, seed);
        // Buffer drops before the context by declaration order.
    }
}
