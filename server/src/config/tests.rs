/*
 * This file is a part of the Patricia project
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

use super::*;

fn bare_cli() -> Cli {
    Cli {
        host: None,
        port: None,
        backlog: None,
        config: None,
    }
}

#[test]
fn defaults_when_nothing_is_set() {
    let cfg = resolve(bare_cli()).unwrap();
    assert_eq!(cfg, Config::default());
}

#[test]
fn cli_field_overrides_apply() {
    let cli = Cli {
        port: Some(9999),
        ..bare_cli()
    };
    let cfg = resolve(cli).unwrap();
    assert_eq!(cfg.port, 9999);
    assert_eq!(cfg.host, DEFAULT_HOST);
}

#[test]
fn cli_fields_and_config_file_conflict() {
    let cli = Cli {
        port: Some(9999),
        config: Some(PathBuf::from("/nonexistent/whatever.yaml")),
        ..bare_cli()
    };
    let err = resolve(cli).unwrap_err();
    assert!(matches!(err, ConfigError::Conflict(_)));
}

#[test]
fn config_file_is_parsed() {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("patricia-test-config-{}.yaml", std::process::id()));
    std::fs::write(&path, "host: 0.0.0.0\nport: 1234\n").unwrap();

    let cli = Cli {
        config: Some(path.clone()),
        ..bare_cli()
    };
    let cfg = resolve(cli).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(cfg.host, IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
    assert_eq!(cfg.port, 1234);
    assert_eq!(cfg.backlog, DEFAULT_BACKLOG);
}

#[test]
fn missing_config_file_is_an_io_error() {
    let cli = Cli {
        config: Some(PathBuf::from("/definitely/not/a/real/path.yaml")),
        ..bare_cli()
    };
    let err = resolve(cli).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

// Environment-variable precedence touches real process state, so this one
// test owns all three PATRICIA_* vars itself and cleans them up again
// rather than spreading env mutation across several tests that `cargo
// test`'s default thread-per-test runner could otherwise interleave.
#[test]
fn env_vars_override_and_conflict_with_cli_fields() {
    std::env::set_var(ENV_HOST, "0.0.0.0");
    std::env::set_var(ENV_PORT, "4242");

    let cfg = resolve(bare_cli()).unwrap();
    assert_eq!(cfg.host, IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
    assert_eq!(cfg.port, 4242);

    let cli = Cli {
        backlog: Some(5),
        ..bare_cli()
    };
    let err = resolve(cli).unwrap_err();
    assert!(matches!(err, ConfigError::Conflict(_)));

    std::env::remove_var(ENV_HOST);
    std::env::remove_var(ENV_PORT);
}
