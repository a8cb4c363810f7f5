// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use markus_app::NoteController;
use markus_db::Store;
use std::env;
use std::path::PathBuf;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `markus --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    logging::init(&config.log_path()?, config.log_level())?;
    info!(db = %db_path.display(), demo = options.demo, "starting");

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or MARKUS_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    if options.demo {
        store.seed_demo_data()?;
    }

    if options.check_only {
        print!("{}", check_report(&store)?);
        return Ok(());
    }

    let mut controller = NoteController::with_sort(store, config.sort_key());
    markus_tui::run_app(&mut controller)
}

/// One `status: count` line per note status.
fn check_report(store: &Store) -> Result<String> {
    let mut report = String::new();
    for (status, count) in store.status_counts()? {
        report.push_str(&format!("{}: {count}\n", status.as_str()));
    }
    Ok(report)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let flag = match arg.as_ref() {
            "--config" => {
                let path = args.next().ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(path.as_ref());
                continue;
            }
            "--print-config-path" => &mut options.print_config_path,
            "--print-path" => &mut options.print_db_path,
            "--print-example-config" => &mut options.print_example,
            "--demo" => &mut options.demo,
            "--check" => &mut options.check_only,
            "--help" | "-h" => &mut options.show_help,
            unknown => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options")
            }
        };
        *flag = true;
    }

    Ok(options)
}

fn print_help() {
    println!("markus - terminal notes");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch with seeded demo data (in-memory)");
    println!("  --check                  Validate config + DB, print note counts, exit");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, check_report, parse_cli_args};
    use anyhow::Result;
    use markus_app::{NoteStatus, NoteStore};
    use markus_db::Store;
    use markus_testkit::NoteFaker;
    use std::path::PathBuf;

    fn default_config() -> PathBuf {
        PathBuf::from("/tmp/markus-config.toml")
    }

    #[test]
    fn no_arguments_launches_the_ui_with_default_config() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_config())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_config(),
                print_config_path: false,
                print_db_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn each_flag_sets_only_its_option() -> Result<()> {
        let cases: [(&str, fn(&CliOptions) -> bool); 7] = [
            ("--print-config-path", |o| o.print_config_path),
            ("--print-path", |o| o.print_db_path),
            ("--print-example-config", |o| o.print_example),
            ("--demo", |o| o.demo),
            ("--check", |o| o.check_only),
            ("--help", |o| o.show_help),
            ("-h", |o| o.show_help),
        ];
        for (flag, is_set) in cases {
            let options = parse_cli_args([flag], default_config())?;
            assert!(is_set(&options), "{flag} did not set its option");
            assert_eq!(options.config_path, default_config());
        }
        Ok(())
    }

    #[test]
    fn config_flag_takes_the_next_argument() -> Result<()> {
        let options = parse_cli_args(
            ["--demo", "--config", "/notes/markus.toml", "--check"],
            default_config(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/notes/markus.toml"));
        assert!(options.demo);
        assert!(options.check_only);

        let error = parse_cli_args(["--config"], default_config())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
        Ok(())
    }

    #[test]
    fn unknown_argument_points_at_help() {
        let error = parse_cli_args(["--sync"], default_config())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument \"--sync\""));
        assert!(message.contains("--help"));
    }

    #[test]
    fn check_report_lists_every_status() -> Result<()> {
        let mut store = Store::open_memory()?;
        store.bootstrap()?;
        let mut faker = NoteFaker::new(7);
        for _ in 0..3 {
            let mut note = faker.new_note();
            note.status = NoteStatus::Archived;
            store.insert(&note)?;
        }

        assert_eq!(check_report(&store)?, "active: 0\narchived: 3\ndeleted: 0\n");
        Ok(())
    }

    #[test]
    fn check_report_counts_demo_notes() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        store.seed_demo_data()?;
        let report = check_report(&store)?;
        assert_eq!(report.lines().count(), 3);
        assert!(!report.contains(": 0"));
        Ok(())
    }
}
