//! Sweep controller tests against a recording device.
//!
//! The device performs no work; it records every call so ordering, geometry
//! and lifecycle guarantees of the sweep can be checked without hardware.

use std::cell::RefCell;

use mixbench_core::prelude::*;

const TEMPLATE: &str = r#"
extern "C" __global__ void benchmark_func(class_T seed, class_T *g_data) {
#ifdef BLOCK_STRIDED
    const int stride = blockdim;
#else
    const int stride = griddim;
#endif
    g_data[threadIdx.x * stride] = seed * memory_ratio;
}
"#;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Alloc(usize),
    ZeroFill,
    Compile(String),
    Launch {
        kernel: String,
        geometry: LaunchGeometry,
        seed: Seed,
    },
    ReadBack(usize),
    ReleaseKernel(String),
    ReleaseBuffer,
}

#[derive(Default)]
struct RecordingDevice {
    events: RefCell<Vec<Event>>,
    fail_compile: Option<String>,
    elapsed_ms: f64,
}

impl RecordingDevice {
    fn new() -> Self {
        Self {
            elapsed_ms: 2.0,
            ..Default::default()
        }
    }

    fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    fn launches(&self) -> Vec<(String, LaunchGeometry, Seed)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Launch {
                    kernel,
                    geometry,
                    seed,
                } => Some((kernel, geometry, seed)),
                _ => None,
            })
            .collect()
    }
}

impl ComputeDevice for RecordingDevice {
    type Kernel = String;
    type Buffer = Vec<f64>;

    fn name(&self) -> String {
        "recording device".to_string()
    }

    fn alloc_buffer(&self, elements: usize) -> Result<Vec<f64>> {
        self.events.borrow_mut().push(Event::Alloc(elements));
        Ok(vec![f64::NAN; elements])
    }

    fn zero_fill(&self, buffer: &mut Vec<f64>) -> Result<()> {
        self.events.borrow_mut().push(Event::ZeroFill);
        buffer.iter_mut().for_each(|v| *v = 0.0);
        Ok(())
    }

    fn compile(&self, spec: &KernelSpec) -> Result<String> {
        let name = spec.name();
        if self.fail_compile.as_deref() == Some(name.as_str()) {
            return Err(MixbenchError::compile(name, "error: expected ';'\n"));
        }
        self.events.borrow_mut().push(Event::Compile(name.clone()));
        Ok(name)
    }

    fn launch_timed(
        &self,
        kernel: &String,
        launch: &KernelLaunch<'_>,
        buffer: &mut Vec<f64>,
    ) -> Result<f64> {
        self.events.borrow_mut().push(Event::Launch {
            kernel: kernel.clone(),
            geometry: *launch.geometry,
            seed: launch.seed,
        });
        buffer[0] += 1.0;
        Ok(self.elapsed_ms)
    }

    fn read_back(&self, buffer: &Vec<f64>, output: &mut [f64]) -> Result<()> {
        self.events.borrow_mut().push(Event::ReadBack(output.len()));
        output.copy_from_slice(&buffer[..output.len()]);
        Ok(())
    }

    fn release_kernel(&self, kernel: String) -> Result<()> {
        self.events.borrow_mut().push(Event::ReleaseKernel(kernel));
        Ok(())
    }

    fn release_buffer(&self, _buffer: Vec<f64>) -> Result<()> {
        self.events.borrow_mut().push(Event::ReleaseBuffer);
        Ok(())
    }
}

fn template() -> KernelTemplate {
    KernelTemplate::from_source("inline", TEMPLATE).unwrap()
}

fn small_config() -> BenchConfig {
    BenchConfigBuilder::new()
        .with_comp_iterations(64)
        .with_unroll_iterations(8)
        .with_block_size(4)
        .build()
        .unwrap()
}

const ELEMENTS: usize = 1024;

#[test]
fn test_reference_sweep_rows() {
    let device = RecordingDevice::new();
    let elements = 8 * 1024 * 1024;
    let mut output = vec![0.0f64; elements];
    let mut rows: Vec<SweepRow> = Vec::new();

    let report = run_mix_benchmark(
        &device,
        &template(),
        &mut output,
        elements,
        BenchConfig::default(),
        SweepOptions::default(),
        &mut rows,
    )
    .unwrap();

    assert_eq!(rows.len(), 33);
    assert_eq!(report.rows, rows);
    let ratios: Vec<u32> = rows.iter().map(|r| r.ratio.memory_slots()).collect();
    assert_eq!(ratios.first(), Some(&32));
    assert_eq!(ratios.last(), Some(&0));
    assert!(ratios.windows(2).all(|w| w[0] == w[1] + 1));

    assert_eq!(report.geometry.grid_size, 262_144);
    assert_eq!(report.geometry.blocks(), 1024);
}

#[test]
fn test_compiles_precede_launches() {
    let device = RecordingDevice::new();
    let mut output = vec![0.0f64; ELEMENTS];
    let mut rows: Vec<SweepRow> = Vec::new();

    run_mix_benchmark(
        &device,
        &template(),
        &mut output,
        ELEMENTS,
        small_config(),
        SweepOptions::all_types(AddressingMode::BlockStrided),
        &mut rows,
    )
    .unwrap();

    let events = device.events();
    let last_compile = events
        .iter()
        .rposition(|e| matches!(e, Event::Compile(_)))
        .unwrap();
    let first_launch = events
        .iter()
        .position(|e| matches!(e, Event::Launch { .. }))
        .unwrap();
    assert!(last_compile < first_launch);

    // warmup + 3 types x 9 ratio points
    let compiles = events
        .iter()
        .filter(|e| matches!(e, Event::Compile(_)))
        .count();
    assert_eq!(compiles, 1 + 3 * 9);
    assert_eq!(events[0], Event::Alloc(ELEMENTS));
    assert_eq!(events[1], Event::ZeroFill);
}

#[test]
fn test_geometry_identical_across_ratios() {
    let device = RecordingDevice::new();
    let mut output = vec![0.0f64; ELEMENTS];
    let mut rows: Vec<SweepRow> = Vec::new();
    let config = small_config();

    let report = run_mix_benchmark(
        &device,
        &template(),
        &mut output,
        ELEMENTS,
        config,
        SweepOptions::all_types(AddressingMode::GridStrided),
        &mut rows,
    )
    .unwrap();

    let launches = device.launches();
    assert_eq!(launches.len(), 1 + 3 * 9);

    let (warmup_kernel, warmup_geometry, warmup_seed) = &launches[0];
    assert!(warmup_kernel.starts_with("benchmark_func<int,r=0,grid>"));
    assert_eq!(*warmup_seed, Seed::Int(1));
    let expected_warmup = LaunchGeometry::for_warmup(&config, ELEMENTS).unwrap();
    assert_eq!(*warmup_geometry, expected_warmup);

    for (_, geometry, _) in &launches[1..] {
        assert_eq!(*geometry, report.geometry);
    }
    // 1024 / (4 * 2) = 128 threads, 32 blocks of 4
    assert_eq!(report.geometry.grid_size, 128);
    assert_eq!(report.geometry.blocks(), 32);
}

#[test]
fn test_launch_order_and_seeds() {
    let device = RecordingDevice::new();
    let mut output = vec![0.0f64; ELEMENTS];
    let mut rows: Vec<SweepRow> = Vec::new();

    run_mix_benchmark(
        &device,
        &template(),
        &mut output,
        ELEMENTS,
        small_config(),
        SweepOptions::all_types(AddressingMode::BlockStrided),
        &mut rows,
    )
    .unwrap();

    let launches = device.launches();
    let first_row: Vec<&str> = launches[1..4].iter().map(|(k, _, _)| k.as_str()).collect();
    assert_eq!(
        first_row,
        vec![
            "benchmark_func<float,r=8,block>",
            "benchmark_func<double,r=8,block>",
            "benchmark_func<int,r=8,block>",
        ]
    );
    assert_eq!(launches[1].2, Seed::Float(1.0));
    assert_eq!(launches[2].2, Seed::Double(1.0));
    assert_eq!(launches[3].2, Seed::Int(1));

    let (last, _, _) = launches.last().unwrap();
    assert_eq!(last, "benchmark_func<int,r=0,block>");
}

#[test]
fn test_disabled_types_report_sentinels() {
    let device = RecordingDevice::new();
    let mut output = vec![0.0f64; ELEMENTS];
    let mut rows: Vec<SweepRow> = Vec::new();

    let report = run_mix_benchmark(
        &device,
        &template(),
        &mut output,
        ELEMENTS,
        small_config(),
        SweepOptions::default(),
        &mut rows,
    )
    .unwrap();

    for row in &rows {
        assert!(row.get(ElementType::Float).timing.is_measured());
        for disabled in [ElementType::Double, ElementType::Int] {
            let timing = row.get(disabled).timing;
            assert_eq!(timing.elapsed_ms(), SENTINEL);
            assert_eq!(timing.giga_ops(), SENTINEL);
            assert_eq!(timing.giga_bytes(), SENTINEL);
        }
    }
    assert!(report.peak(ElementType::Double).is_none());
    assert!(report.peak(ElementType::Int).is_none());

    let launched_types: Vec<String> = device
        .launches()
        .into_iter()
        .skip(1)
        .map(|(k, _, _)| k)
        .collect();
    assert!(launched_types.iter().all(|k| k.contains("<float,")));
}

#[test]
fn test_peak_tracks_extremes() {
    let device = RecordingDevice::new();
    let mut output = vec![0.0f64; ELEMENTS];
    let mut rows: Vec<SweepRow> = Vec::new();

    let report = run_mix_benchmark(
        &device,
        &template(),
        &mut output,
        ELEMENTS,
        small_config(),
        SweepOptions::default(),
        &mut rows,
    )
    .unwrap();

    // Constant elapsed time: throughput peaks at all-compute, bandwidth at all-memory.
    let peak = report.peak(ElementType::Float).unwrap();
    assert_eq!(peak.giga_ops_ratio.memory_slots(), 0);
    assert_eq!(peak.giga_bytes_ratio.memory_slots(), 8);
    assert!(peak.giga_ops > 0.0);
    assert!(peak.giga_bytes > 0.0);
}

#[test]
fn test_resources_released_after_readback() {
    let device = RecordingDevice::new();
    let mut output = vec![0.0f64; ELEMENTS];
    let mut rows: Vec<SweepRow> = Vec::new();

    run_mix_benchmark(
        &device,
        &template(),
        &mut output,
        ELEMENTS,
        small_config(),
        SweepOptions::default(),
        &mut rows,
    )
    .unwrap();

    let events = device.events();
    let readback = events
        .iter()
        .position(|e| *e == Event::ReadBack(ELEMENTS))
        .unwrap();
    let releases: Vec<&Event> = events[readback + 1..].iter().collect();
    assert_eq!(releases.len(), 1 + 9 + 1);
    assert_eq!(*releases.last().unwrap(), &Event::ReleaseBuffer);

    let mut released: Vec<String> = releases
        .iter()
        .filter_map(|e| match e {
            Event::ReleaseKernel(k) => Some(k.clone()),
            _ => None,
        })
        .collect();
    let mut compiled: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            Event::Compile(k) => Some(k.clone()),
            _ => None,
        })
        .collect();
    released.sort();
    compiled.sort();
    assert_eq!(released, compiled);

    // warmup + 9 float launches, each adding one to slot 0
    assert_eq!(output[0], 10.0);
    assert!(output[1..].iter().all(|v| *v == 0.0));
}

#[test]
fn test_short_output_rejected() {
    let device = RecordingDevice::new();
    let mut output = vec![0.0f64; ELEMENTS - 1];
    let mut rows: Vec<SweepRow> = Vec::new();

    let err = run_mix_benchmark(
        &device,
        &template(),
        &mut output,
        ELEMENTS,
        small_config(),
        SweepOptions::default(),
        &mut rows,
    )
    .unwrap_err();

    assert!(matches!(err, MixbenchError::InvalidConfig(_)));
    assert!(device.events().is_empty());
}

#[test]
fn test_compile_failure_stops_before_launch() {
    let device = RecordingDevice {
        fail_compile: Some("benchmark_func<float,r=3,block>".to_string()),
        ..RecordingDevice::new()
    };
    let mut output = vec![0.0f64; ELEMENTS];
    let mut rows: Vec<SweepRow> = Vec::new();

    let err = run_mix_benchmark(
        &device,
        &template(),
        &mut output,
        ELEMENTS,
        small_config(),
        SweepOptions::default(),
        &mut rows,
    )
    .unwrap_err();

    assert!(err.is_compile_error());
    let mut diagnostic = Vec::new();
    err.write_diagnostic(&mut diagnostic).unwrap();
    let text = String::from_utf8(diagnostic).unwrap();
    assert!(text.contains("benchmark_func<float,r=3,block>"));
    assert!(text.contains("expected ';'"));
    assert!(device.launches().is_empty());
    assert!(rows.is_empty());
}

#[test]
fn test_zero_elapsed_is_launch_error() {
    let device = RecordingDevice {
        elapsed_ms: 0.0,
        ..RecordingDevice::new()
    };
    let mut output = vec![0.0f64; ELEMENTS];
    let mut rows: Vec<SweepRow> = Vec::new();

    let err = run_mix_benchmark(
        &device,
        &template(),
        &mut output,
        ELEMENTS,
        small_config(),
        SweepOptions::default(),
        &mut rows,
    )
    .unwrap_err();
    assert!(matches!(err, MixbenchError::Launch { .. }));
}

#[test]
fn test_controller_runs_once() {
    let device = RecordingDevice::new();
    let mut output = vec![0.0f64; ELEMENTS];
    let mut rows: Vec<SweepRow> = Vec::new();

    let mut controller = SweepController::new(
        &device,
        small_config(),
        SweepOptions::default(),
        ELEMENTS,
    )
    .unwrap();
    assert_eq!(controller.state(), SweepState::Idle);

    controller.run(&template(), &mut rows, &mut output).unwrap();
    assert_eq!(controller.state(), SweepState::Released);

    let err = controller
        .run(&template(), &mut rows, &mut output)
        .unwrap_err();
    assert!(matches!(err, MixbenchError::InvalidState { .. }));
}

#[test]
fn test_uneven_buffer_rejected() {
    let device = RecordingDevice::new();
    // 1000 / 8 = 125 threads, not a multiple of 4
    let result = SweepController::new(&device, small_config(), SweepOptions::default(), 1000);
    assert!(matches!(result, Err(MixbenchError::InvalidConfig(_))));
}
