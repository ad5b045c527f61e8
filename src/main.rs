use clap::{Arg, ArgAction, ArgMatches, Command};
use interceptsim::guidance::GuidanceRegistry;
use interceptsim::logging::{LogConfig, LogOutput, init_logging, level_from_verbosity, parse_log_level};
use interceptsim::scenario::ScenarioConfig;
use interceptsim::simulation::{SimulationEngine, SimulationState, SimulationStatus};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// 観測側のポーリング周期（約30Hz）
const OBSERVE_PERIOD: Duration = Duration::from_millis(33);

/// 実行方式
#[derive(Debug, Clone, Copy, PartialEq)]
enum RunMode {
    /// ティックループを実時間で動かし、観測側がポーリングする
    Realtime,
    /// `step()` を直接呼び出して可能な限り高速に進める
    Step,
}

fn build_cli() -> Command {
    Command::new("interceptsim")
        .version("0.1.0")
        .about("迎撃シミュレーション (Missile Intercept Simulation)")
        .long_about("ターゲットと誘導ミサイルの2体を固定周期で計算する迎撃シミュレーション\n\
                     比例航法・純追尾・先行追尾の誘導則を切り替えて評価できます。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .long_help("実行するシナリオファイル(.yaml)のパスを指定します。\n\
                           指定しない場合、デフォルトシナリオで実行されます。")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
        )
        .arg(
            Arg::new("guidance")
                .short('g')
                .long("guidance")
                .value_name("NAME")
                .help("誘導則を指定 (ProNav, PurePursuit, LeadPursuit)")
        )
        .arg(
            Arg::new("list-guidance")
                .long("list-guidance")
                .action(ArgAction::SetTrue)
                .help("利用可能な誘導則の一覧を表示して終了")
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .value_parser(["realtime", "step"])
                .default_value("realtime")
                .help("実行方式 (realtime: 実時間ループ, step: 直接ステップ実行)")
        )
        .arg(
            Arg::new("max-time")
                .long("max-time")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(f64))
                .default_value("120")
                .help("シミュレーション時間の上限（秒）")
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("観測したスナップショットをJSON Linesで標準出力へ出力")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("詳細出力レベル (-v: デバッグ, -vv: トレース)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)。-v より優先")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("OUTPUT")
                .default_value("console")
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .value_name("DIR")
                .default_value("logs")
                .help("ログファイルの出力ディレクトリ")
        )
}

fn main() {
    let matches = build_cli().get_matches();

    if let Err(e) = run(&matches) {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let log_config = log_config_from(matches)?;
    let _guard = init_logging(&log_config)?;

    if matches.get_flag("list-guidance") {
        let registry = GuidanceRegistry::default();
        println!("利用可能な誘導則:");
        for name in registry.names() {
            let marker = if name == registry.default_name() { " (デフォルト)" } else { "" };
            println!("  {}{}", name, marker);
        }
        return Ok(());
    }

    let mut scenario = match matches.get_one::<String>("scenario") {
        Some(path) => {
            let scenario = ScenarioConfig::from_file(path)?;
            debug!(path = %path, "シナリオファイル読み込み完了");
            scenario
        }
        None => ScenarioConfig::default(),
    };

    if let Some(guidance) = matches.get_one::<String>("guidance") {
        scenario.sim.guidance = guidance.clone();
    }

    if matches.get_flag("info") {
        scenario.print_summary();
        return Ok(());
    }

    let mode = match matches.get_one::<String>("mode").map(String::as_str) {
        Some("step") => RunMode::Step,
        _ => RunMode::Realtime,
    };
    let max_time = matches.get_one::<f64>("max-time").copied().unwrap_or(120.0);
    let json = matches.get_flag("json");

    let engine = SimulationEngine::new(scenario);
    let final_state = match mode {
        RunMode::Realtime => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_time()
                .build()?;
            runtime.block_on(run_realtime(&engine, max_time, json))?
        }
        RunMode::Step => run_stepped(&engine, max_time, json)?,
    };

    print_result(&engine, &final_state);
    Ok(())
}

fn log_config_from(matches: &ArgMatches) -> Result<LogConfig, Box<dyn std::error::Error>> {
    let level = match matches.get_one::<String>("log-level") {
        Some(level) => parse_log_level(level),
        None => level_from_verbosity(matches.get_count("verbose")),
    };
    let output = matches
        .get_one::<String>("log-output")
        .map(|s| s.parse::<LogOutput>())
        .transpose()?
        .unwrap_or(LogOutput::Console);
    let log_dir = matches
        .get_one::<String>("log-dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("logs"));

    Ok(LogConfig {
        level,
        output,
        log_dir,
        ..LogConfig::default()
    })
}

/// ティックループを実時間で動かし、約30Hzで状態を観測する
async fn run_realtime(
    engine: &SimulationEngine,
    max_time: f64,
    json: bool,
) -> Result<SimulationState, Box<dyn std::error::Error>> {
    info!(max_time, "=== シミュレーション実行開始 (realtime) ===");
    engine.start();

    let mut observe = tokio::time::interval(OBSERVE_PERIOD);
    let state = loop {
        observe.tick().await;
        let state = engine.get_state();
        if json {
            emit_json(&state)?;
        }
        if !engine.is_running() || state.time >= max_time {
            break state;
        }
    };

    engine.stop();
    Ok(state)
}

/// `step()` を直接呼び出して進める
///
/// 観測は実時間換算で約30Hzごとに行います。
fn run_stepped(
    engine: &SimulationEngine,
    max_time: f64,
    json: bool,
) -> Result<SimulationState, Box<dyn std::error::Error>> {
    info!(max_time, "=== シミュレーション実行開始 (step) ===");
    let observe_every = ((OBSERVE_PERIOD.as_secs_f64() / engine.dt()).round() as u64).max(1);
    engine.start_manual();

    loop {
        let state = engine.get_state();
        if json && engine.step_count() % observe_every == 0 {
            emit_json(&state)?;
        }
        if state.status != SimulationStatus::Running || state.time >= max_time {
            break;
        }
        engine.step();
    }

    engine.stop();
    let state = engine.get_state();
    if json {
        emit_json(&state)?;
    }
    Ok(state)
}

fn emit_json(state: &SimulationState) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(state)?);
    Ok(())
}

fn print_result(engine: &SimulationEngine, state: &SimulationState) {
    info!("=== シミュレーション完了 ===");
    eprintln!("=== 結果 ===");
    eprintln!("状態: {}", state.status);
    eprintln!("経過時間: {:.3}秒", state.time);
    eprintln!("総ステップ数: {}", engine.step_count());
    eprintln!("誘導則: {}", engine.guidance_mode());
    if let Some(distance) = state.miss_distance() {
        eprintln!("ミサイル-ターゲット間距離: {:.2}m", distance);
    }
    if state.status.is_terminal() {
        eprintln!("迎撃: {}", if state.intercept { "成功" } else { "失敗" });
    }
}
