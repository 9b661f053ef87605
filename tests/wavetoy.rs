//! Scalar wave equation project: initial data, diagnostics and RHS kernels
//! registered through the deferred protocol.

use nrgen::{
    codegen, declare, declare_derivative, lower, trace, Args, DispatchMode, Discovery, ExprId, FdConfig,
    GenerationSession, KernelBatch, KernelBody, KernelRecord, KernelRoutine, LowerConfig, Partition, RegistryError,
    SessionConfig, VectorConfig,
};

const ID_THORN: &str = "IDWaveToyNRPy";
const DIAG_THORN: &str = "DiagWaveToyNRPy";
const EVOL_THORN: &str = "WaveToyNRPy";

const ET_INCLUDES: [&str; 4] = ["math.h", "cctk.h", "cctk_Arguments.h", "cctk_Parameters.h"];

fn id_args() -> Args {
    Args::new()
        .with("wave_type", "PlaneWave")
        .with("sigma", 3.0)
        .with("k", vec![1.0, 1.0, 1.0])
}

/// Exact solution `(uu, vv)` in the thread-local graph.
fn exact_solution(args: &Args) -> anyhow::Result<(ExprId, ExprId)> {
    let x = [ExprId::scalar("xx0"), ExprId::scalar("xx1"), ExprId::scalar("xx2")];
    let time = ExprId::scalar("time");
    let c = ExprId::scalar("wavespeed");
    match args.str("wave_type")? {
        "PlaneWave" => {
            let k: Vec<f64> = args
                .list("k")?
                .iter()
                .map(|v| v.bare().parse::<f64>())
                .collect::<Result<_, _>>()?;
            anyhow::ensure!(k.len() == 3, "plane wave needs three wavenumbers");
            let norm = k.iter().map(|ki| ki * ki).sum::<f64>().sqrt();
            let phase: ExprId = (0..3).map(|i| ExprId::from_f64(k[i] / norm) * x[i]).sum::<ExprId>() - c * time;
            Ok((ExprId::int(2) + phase.sin(), -c * phase.cos()))
        }
        "SphericalGaussian" => {
            let sigma = ExprId::from_f64(args.float("sigma")?);
            let r = (x[0] * x[0] + x[1] * x[1] + x[2] * x[2]).sqrt();
            let s = r - c * time;
            let e = (-(s * s) / (ExprId::int(2) * sigma * sigma)).exp();
            let uu = ExprId::int(2) + s / r * e;
            let vv = c * e / r * (s * s / (sigma * sigma) - ExprId::int(1));
            Ok((uu, vv))
        }
        other => anyhow::bail!("unknown wave type `{other}`"),
    }
}

struct ExactSolutionSinglePoint;

impl KernelRoutine for ExactSolutionSinglePoint {
    fn name(&self) -> &str {
        "exact_solution_single_point"
    }

    fn build(&self, args: &Args, out: &mut KernelBatch) -> anyhow::Result<()> {
        let (uu, vv) = exact_solution(args)?;
        let cfg = LowerConfig { include_braces: false, ..LowerConfig::default() };
        let body = codegen(&[("*exact_soln_UUGF", uu), ("*exact_soln_VVGF", vv)], &cfg)?;
        out.register(
            KernelRecord::builder("WaveToy_exact_solution_single_point")
                .params(
                    "const CCTK_REAL xx0, const CCTK_REAL xx1, const CCTK_REAL xx2, \
                     CCTK_REAL *restrict exact_soln_UUGF, CCTK_REAL *restrict exact_soln_VVGF",
                )
                .includes(ET_INCLUDES)
                .include_code_parameters_h(true)
                .subdirectory(ID_THORN)
                .desc("Exact solution at a single point.")
                .body(KernelBody::new(body).with_preamble("DECLARE_CCTK_PARAMETERS"))
                .build()?,
        );
        Ok(())
    }
}

struct ExactSolutionAllPoints;

impl KernelRoutine for ExactSolutionAllPoints {
    fn name(&self) -> &str {
        "exact_solution_all_points"
    }

    fn instance_args(&self) -> &[&'static str] {
        &["thorn_name"]
    }

    fn discover(&self, _args: &Args, calls: &mut Discovery) -> anyhow::Result<()> {
        calls.call("exact_solution_single_point", id_args());
        Ok(())
    }

    fn build(&self, args: &Args, out: &mut KernelBatch) -> anyhow::Result<()> {
        let thorn = args.str("thorn_name")?;
        let (uu, vv) = if thorn == ID_THORN { ("uu", "vv") } else { ("uu_exact", "vv_exact") };
        let bin = if thorn == DIAG_THORN { "CCTK_ANALYSIS" } else { "CCTK_INITIAL" };
        let call = format!(
            "WaveToy_exact_solution_single_point(x[idx], y[idx], z[idx], &{uu}[idx], &{vv}[idx]);"
        );
        out.register(
            KernelRecord::builder(format!("{thorn}_exact_solution_all_points"))
                .params("CCTK_ARGUMENTS")
                .includes(ET_INCLUDES)
                .subdirectory(thorn)
                .desc("Set the exact solution at all grid points.")
                .body(
                    KernelBody::new(call)
                        .with_preamble("DECLARE_CCTK_PARAMETERS\nLOOP_ALL_POINTS_BEGIN {")
                        .with_postamble("} LOOP_ALL_POINTS_END"),
                )
                .tag("schedule_bin", bin)
                .build()?,
        );
        Ok(())
    }
}

struct RhsEval;

impl KernelRoutine for RhsEval {
    fn name(&self) -> &str {
        "rhs_eval"
    }

    fn instance_args(&self) -> &[&'static str] {
        &["thorn_name"]
    }

    fn build(&self, args: &Args, out: &mut KernelBatch) -> anyhow::Result<()> {
        let thorn = args.str("thorn_name")?;
        let fd_order = args.int("fd_order")? as usize;
        let simd = args.bool("enable_simd")?;

        let uu_dd = declare_derivative("uu", 0, 2, 3, "sym01")?;
        let vv = ExprId::scalar("vv");
        let c = ExprId::scalar("wavespeed");
        let lap: ExprId = (0..3).map(|i| uu_dd[&[i, i][..]]).sum();
        let uu_rhs = vv;
        let vv_rhs = c * c * lap;

        let mut cfg = LowerConfig::default().with_fd(FdConfig::new(fd_order, ["uu", "vv"]));
        cfg.include_braces = false;
        let mut includes: Vec<&str> = ET_INCLUDES.to_vec();
        if simd {
            cfg = cfg.with_vector(VectorConfig::default());
            includes.push("simd/simd_intrinsics.h");
        }
        let body = codegen(
            &[
                ("rhs_gfs[IDX4(UUGF, i0, i1, i2)]", uu_rhs),
                ("rhs_gfs[IDX4(VVGF, i0, i1, i2)]", vv_rhs),
            ],
            &cfg,
        )?;

        out.register(
            KernelRecord::builder(format!("{thorn}_rhs_eval"))
                .params("CCTK_ARGUMENTS")
                .includes(includes)
                .include_code_parameters_h(true)
                .subdirectory(thorn)
                .desc("Set RHSs for wave equation.")
                .body(
                    KernelBody::new(body)
                        .with_preamble(format!("DECLARE_CCTK_ARGUMENTS_{thorn}_rhs_eval\nLOOP_INTERIOR_BEGIN {{"))
                        .with_postamble("} LOOP_INTERIOR_END"),
                )
                .tag("schedule_bin", "MoL_CalcRHS")
                .build()?,
        );
        Ok(())
    }
}

fn project(dispatch: DispatchMode, fd_order: i64, simd: bool) -> GenerationSession {
    let mut s = GenerationSession::open(SessionConfig::default().with_dispatch(dispatch));
    s.install(ExactSolutionSinglePoint).unwrap();
    s.install(ExactSolutionAllPoints).unwrap();
    s.install(RhsEval).unwrap();

    s.call("exact_solution_single_point", id_args()).unwrap();
    for thorn in [ID_THORN, DIAG_THORN] {
        s.call("exact_solution_all_points", Args::new().with("thorn_name", thorn))
            .unwrap();
    }
    s.call(
        "rhs_eval",
        Args::new()
            .with("thorn_name", EVOL_THORN)
            .with("fd_order", fd_order)
            .with("enable_simd", simd),
    )
    .unwrap();
    s
}

#[test]
fn wavetoy_registers_every_kernel() {
    nrgen::logging::init_for_tests();
    let mut s = project(DispatchMode::Sequential, 4, false);
    let plan = s.discover().unwrap();
    let order: Vec<&str> = plan.entries().iter().map(|e| e.qualified.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "exact_solution_single_point",
            "exact_solution_all_points[thorn_name=IDWaveToyNRPy]",
            "exact_solution_all_points[thorn_name=DiagWaveToyNRPy]",
            "rhs_eval[thorn_name=WaveToyNRPy]",
        ]
    );

    let reg = s.run().unwrap();
    assert_eq!(
        reg.names(),
        vec![
            "DiagWaveToyNRPy_exact_solution_all_points",
            "IDWaveToyNRPy_exact_solution_all_points",
            "WaveToyNRPy_rhs_eval",
            "WaveToy_exact_solution_single_point",
        ]
    );
    assert_eq!(reg.groups(), vec![DIAG_THORN, ID_THORN, EVOL_THORN]);
    assert_eq!(reg.group(ID_THORN).len(), 2);

    let diag = reg.get("DiagWaveToyNRPy_exact_solution_all_points").unwrap();
    assert_eq!(diag.tags["schedule_bin"], "CCTK_ANALYSIS");
    assert!(diag.body.statements.contains("&uu_exact[idx]"));

    let rhs = reg.get("WaveToyNRPy_rhs_eval").unwrap();
    let src = rhs.full_function();
    assert!(src.starts_with("#include \"math.h\"\n"));
    assert!(src.contains("void WaveToyNRPy_rhs_eval(CCTK_ARGUMENTS) {\n#include \"set_CodeParameters.h\"\n"));
    assert!(src.contains("const REAL uu_i0m2_i1_i2 = in_gfs[IDX4(UUGF, i0-2, i1, i2)];"));
    assert!(src.contains("const REAL uu_i0_i1_i2p2 = in_gfs[IDX4(UUGF, i0, i1, i2+2)];"));
    assert!(src.contains("rhs_gfs[IDX4(UUGF, i0, i1, i2)] = vv;"));
    assert!(src.ends_with("} LOOP_INTERIOR_END\n} // END FUNCTION WaveToyNRPy_rhs_eval\n"));
}

#[test]
fn parallel_dispatch_matches_sequential() {
    let mut seq = project(DispatchMode::Sequential, 4, true);
    let seq = seq.run().unwrap().clone();
    for partition in [Partition::PerEntry, Partition::Chunks(2), Partition::RoundRobin(3)] {
        let mut par = project(DispatchMode::Parallel { workers: 3, partition }, 4, true);
        assert_eq!(par.run().unwrap(), &seq);
    }
}

#[test]
fn simd_rhs_uses_intrinsics() {
    let mut s = project(DispatchMode::Sequential, 2, true);
    let reg = s.run().unwrap();
    let rhs = reg.get("WaveToyNRPy_rhs_eval").unwrap();
    assert!(rhs.includes.contains(&"simd/simd_intrinsics.h".to_string()));
    let body = &rhs.body.statements;
    assert!(body.contains("const REAL_SIMD_ARRAY uu_i0p1_i1_i2 = ReadSIMD(&in_gfs[IDX4(UUGF, i0+1, i1, i2)]);"));
    assert!(body.contains("WriteSIMD(&rhs_gfs[IDX4(VVGF, i0, i1, i2)], MulSIMD("));
    assert!(!body.contains(" * ") && !body.contains(" + "));
}

#[test]
fn bad_fd_order_fails_the_run() {
    let mut s = project(DispatchMode::Parallel { workers: 2, partition: Partition::PerEntry }, 3, false);
    let err = s.run().unwrap_err();
    match err {
        RegistryError::DispatchFailure { routine, args, source } => {
            assert_eq!(routine, "rhs_eval[thorn_name=WaveToyNRPy]");
            assert_eq!(args.int("fd_order").unwrap(), 3);
            assert!(source.to_string().contains("finite-difference order"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(s.registry().is_empty());
}

#[test]
fn exact_solution_lowering_matches_closed_form() {
    let args = id_args();
    let (g, (uu, vv)) = trace(|| exact_solution(&args).unwrap());
    let batch = vec![("uu".to_string(), uu), ("vv".to_string(), vv)];
    let program = lower(&g, &batch, &LowerConfig::default()).unwrap();

    let (x, y, z, t, c) = (0.3, -1.1, 2.5, 0.75, 1.0);
    let value = |s: &nrgen::Symbol| match s.base.as_str() {
        "xx0" => x,
        "xx1" => y,
        "xx2" => z,
        "time" => t,
        _ => c,
    };
    let got = program.eval_with(value);
    let k = 1.0 / 3f64.sqrt();
    let phase = k * x + k * y + k * z - c * t;
    assert!((got[0] - (2.0 + phase.sin())).abs() < 1e-12);
    assert!((got[1] + c * phase.cos()).abs() < 1e-12);
}

#[test]
fn symmetric_rank2_declares_six_symbols() {
    let (_g, k) = trace(|| declare("K", 2, 3, "sym01").unwrap());
    assert_eq!(k.free_symbols().len(), 6);
    assert_eq!(k[&[0, 1][..]], k[&[1, 0][..]]);
    assert_eq!(k.get(&[2, 1]).unwrap(), k.get(&[1, 2]).unwrap());
    assert_ne!(k[&[0, 0][..]], k[&[0, 1][..]]);
}

#[test]
fn ambiguous_driver_calls_rejected() {
    let mut s = project(DispatchMode::Sequential, 4, false);
    s.call(
        "rhs_eval",
        Args::new()
            .with("thorn_name", EVOL_THORN)
            .with("fd_order", 2)
            .with("enable_simd", false),
    )
    .unwrap();
    assert!(matches!(s.run(), Err(RegistryError::AmbiguousRegistration { .. })));
}
