//! File-move behaviour resolution under the active risk mode.

use seedguard_core::model::{FileMoveBehavior, RiskMode};
use tracing::warn;

/// Adjust a requested file-move behaviour to what the active risk mode
/// permits. Pure and total: every input triple maps to exactly one output,
/// and nothing is denied here — the safety engine has already allowed the
/// action, this only adjusts how it is carried out.
///
/// Under `C_PRO` a requested move is downgraded (to a stub when generating
/// one, otherwise to a copy) so the unlocked release selection can never let
/// a relocation break active seeding. Under `A_SAFE` a move is downgraded to
/// a hardlink unless it is stub generation, which never touches the seeded
/// payload. `B_BALANCED` passes everything through.
#[must_use]
pub fn resolve_move_behavior(
    requested: FileMoveBehavior,
    mode: RiskMode,
    is_strm_generation: bool,
) -> FileMoveBehavior {
    match (mode, requested) {
        (RiskMode::CPro, FileMoveBehavior::Move) => {
            let resolved = if is_strm_generation {
                FileMoveBehavior::StrmOnly
            } else {
                FileMoveBehavior::Copy
            };
            warn!(
                mode = mode.as_str(),
                requested = requested.as_str(),
                resolved = resolved.as_str(),
                "move downgraded to protect active seeding"
            );
            resolved
        }
        (RiskMode::ASafe, FileMoveBehavior::Move) if !is_strm_generation => {
            warn!(
                mode = mode.as_str(),
                requested = requested.as_str(),
                resolved = FileMoveBehavior::Hardlink.as_str(),
                "move downgraded to protect active seeding"
            );
            FileMoveBehavior::Hardlink
        }
        _ => requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_pro_downgrades_moves() {
        assert_eq!(
            resolve_move_behavior(FileMoveBehavior::Move, RiskMode::CPro, false),
            FileMoveBehavior::Copy
        );
        assert_eq!(
            resolve_move_behavior(FileMoveBehavior::Move, RiskMode::CPro, true),
            FileMoveBehavior::StrmOnly
        );
        // Hardlinks pass through unchanged.
        assert_eq!(
            resolve_move_behavior(FileMoveBehavior::Hardlink, RiskMode::CPro, false),
            FileMoveBehavior::Hardlink
        );
    }

    #[test]
    fn a_safe_downgrades_local_moves_only() {
        assert_eq!(
            resolve_move_behavior(FileMoveBehavior::Move, RiskMode::ASafe, false),
            FileMoveBehavior::Hardlink
        );
        // Stub generation never touches the seeded payload.
        assert_eq!(
            resolve_move_behavior(FileMoveBehavior::Move, RiskMode::ASafe, true),
            FileMoveBehavior::Move
        );
    }

    #[test]
    fn balanced_mode_is_the_identity() {
        for behavior in [
            FileMoveBehavior::Move,
            FileMoveBehavior::Copy,
            FileMoveBehavior::Hardlink,
            FileMoveBehavior::Softlink,
            FileMoveBehavior::StrmOnly,
        ] {
            for is_strm in [false, true] {
                assert_eq!(
                    resolve_move_behavior(behavior, RiskMode::BBalanced, is_strm),
                    behavior
                );
            }
        }
    }

    #[test]
    fn non_move_requests_are_never_adjusted() {
        for mode in [RiskMode::ASafe, RiskMode::BBalanced, RiskMode::CPro] {
            for behavior in [
                FileMoveBehavior::Copy,
                FileMoveBehavior::Softlink,
                FileMoveBehavior::StrmOnly,
            ] {
                assert_eq!(resolve_move_behavior(behavior, mode, false), behavior);
            }
        }
    }
}
