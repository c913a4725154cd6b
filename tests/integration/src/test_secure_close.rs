// Licensed under the Apache-2.0 license

//! End-to-end secure-boot close scenarios over the emulated trust root.

use emulator_periph::EmulatedTrustRoot;
use imgsel_common::{CloseOutcome, SecureBootCloser, SecureCloseError, TrustRoot};
use imgsel_config::{CloseMechanism, PlatformConfig, SecureCloseConfig, RNG_SELF_TEST_FAIL_EVENT};

use crate::support::MapEnv;

const SRK_VALUE: u32 = 0x1122_3344;

fn close_config(platform: &'static PlatformConfig) -> &'static SecureCloseConfig {
    platform.secure_close.as_ref().unwrap()
}

/// Trust root with every SRK fuse of `config` burned to `srk_value`,
/// secure-bit wiring matching the platform's close mechanism.
fn fused_trust_root(config: &SecureCloseConfig, srk_value: u32) -> EmulatedTrustRoot {
    let mut trust_root = match config.mechanism {
        CloseMechanism::ProgramFuse { bank, word, value } => {
            EmulatedTrustRoot::new().with_secure_bit(bank, word, value)
        }
        CloseMechanism::PlatformCall => EmulatedTrustRoot::new(),
    };
    for fuse in config.srk_fuses {
        trust_root.set_fuse(fuse.bank, fuse.word, srk_value);
    }
    trust_root
}

#[test]
fn test_imx8m_close_programs_secure_fuse() {
    let config = close_config(&imgsel_config::IMX8M);
    let mut trust_root = fused_trust_root(config, SRK_VALUE);
    let env = MapEnv::with_srk(SRK_VALUE, config.srk_fuses.len());

    let mut closer = SecureBootCloser::new(&mut trust_root, config);
    assert!(!closer.is_closed());
    assert_eq!(closer.close(&env), Ok(CloseOutcome::Closed));

    assert!(trust_root.secure_boot_closed());
    assert_eq!(trust_root.fuse_read(1, 3), Ok(0x0200_0000));
}

#[test]
fn test_imx8qm_close_uses_platform_call() {
    let config = close_config(&imgsel_config::IMX8QM);
    let mut trust_root = fused_trust_root(config, SRK_VALUE);
    let env = MapEnv::with_srk(SRK_VALUE, config.srk_fuses.len());

    let mut closer = SecureBootCloser::new(&mut trust_root, config);
    assert_eq!(closer.close(&env), Ok(CloseOutcome::Closed));
    assert!(trust_root.secure_boot_closed());

    // SRK fuses are compared, never written, by the close flow.
    for fuse in config.srk_fuses {
        assert_eq!(trust_root.fuse_read(fuse.bank, fuse.word), Ok(SRK_VALUE));
    }
}

#[test]
fn test_known_rng_event_is_tolerated_on_imx6() {
    let config = close_config(&imgsel_config::IMX6);
    let mut trust_root = fused_trust_root(config, SRK_VALUE);
    trust_root.push_event(&RNG_SELF_TEST_FAIL_EVENT);
    let env = MapEnv::with_srk(SRK_VALUE, config.srk_fuses.len());

    let mut closer = SecureBootCloser::new(&mut trust_root, config);
    assert!(closer.blocking_events().is_empty());
    assert_eq!(closer.close(&env), Ok(CloseOutcome::Closed));
}

#[test]
fn test_rng_event_signature_blocks_other_platforms() {
    // The same event is NOT allow-listed outside the i.MX6 family.
    let config = close_config(&imgsel_config::IMX8M);
    let mut trust_root = fused_trust_root(config, SRK_VALUE);
    trust_root.push_event(&RNG_SELF_TEST_FAIL_EVENT);
    let env = MapEnv::with_srk(SRK_VALUE, config.srk_fuses.len());

    let mut closer = SecureBootCloser::new(&mut trust_root, config);
    assert_eq!(
        closer.close(&env),
        Err(SecureCloseError::UnresolvedAuthentication { events: 1 })
    );
    assert!(!trust_root.secure_boot_closed());
}

#[test]
fn test_foreign_event_blocks_close_before_fuse_checks() {
    let config = close_config(&imgsel_config::IMX6);
    let mut trust_root = fused_trust_root(config, SRK_VALUE);
    trust_root.push_event(&[0xdb, 0x00, 0x08, 0x43, 0x33]);
    // Environment is deliberately empty: a blocking event must fail the
    // close before any expected value is ever looked up.
    let env = MapEnv::default();

    let mut closer = SecureBootCloser::new(&mut trust_root, config);
    assert_eq!(
        closer.close(&env),
        Err(SecureCloseError::UnresolvedAuthentication { events: 1 })
    );
    assert!(!trust_root.secure_boot_closed());
}

#[test]
fn test_missing_and_mismatched_expectations() {
    let config = close_config(&imgsel_config::IMX7ULP);
    let mut trust_root = fused_trust_root(config, SRK_VALUE);

    let mut env = MapEnv::with_srk(SRK_VALUE, config.srk_fuses.len());
    env.0.remove("srk_9");
    {
        let mut closer = SecureBootCloser::new(&mut trust_root, config);
        assert_eq!(
            closer.close(&env),
            Err(SecureCloseError::MissingExpectedValue { index: 9 })
        );
    }

    let env = MapEnv::with_srk(0x5555_aaaa, config.srk_fuses.len());
    {
        let mut closer = SecureBootCloser::new(&mut trust_root, config);
        assert_eq!(
            closer.close(&env),
            Err(SecureCloseError::FuseMismatch {
                index: 0,
                programmed: SRK_VALUE,
                expected: 0x5555_aaaa,
            })
        );
    }

    // Nothing was programmed by the failed attempts.
    assert!(!trust_root.secure_boot_closed());
    assert_eq!(trust_root.fuse_read(29, 6), Ok(0));
}

#[test]
fn test_close_is_idempotent_across_persisted_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fuses.json");
    let config = close_config(&imgsel_config::IMX8M);
    let env = MapEnv::with_srk(SRK_VALUE, config.srk_fuses.len());

    {
        let mut trust_root = EmulatedTrustRoot::load(&path).unwrap();
        for fuse in config.srk_fuses {
            trust_root.set_fuse(fuse.bank, fuse.word, SRK_VALUE);
        }
        let mut trust_root = match config.mechanism {
            CloseMechanism::ProgramFuse { bank, word, value } => {
                trust_root.with_secure_bit(bank, word, value)
            }
            CloseMechanism::PlatformCall => trust_root,
        };
        let mut closer = SecureBootCloser::new(&mut trust_root, config);
        assert_eq!(closer.close(&env), Ok(CloseOutcome::Closed));
        trust_root.save().unwrap();
    }

    // A later session sees the burned secure fuse and does nothing, even
    // with no expectations configured.
    let mut trust_root = match config.mechanism {
        CloseMechanism::ProgramFuse { bank, word, value } => {
            EmulatedTrustRoot::load(&path).unwrap().with_secure_bit(bank, word, value)
        }
        CloseMechanism::PlatformCall => EmulatedTrustRoot::load(&path).unwrap(),
    };
    let mut closer = SecureBootCloser::new(&mut trust_root, config);
    assert_eq!(closer.close(&MapEnv::default()), Ok(CloseOutcome::AlreadyClosed));
}
