//! # Combat Resolution
//!
//! Pure damage and heal arithmetic shared by the player and enemies. Callers apply the
//! results to actor state and handle deaths.

/// Damage dealt by an attack: attacker power minus defender defense, floored at zero.
///
/// # Examples
///
/// ```
/// use delve::resolve_attack;
///
/// assert_eq!(resolve_attack(10, 3), 7);
/// assert_eq!(resolve_attack(2, 5), 0);
/// ```
pub fn resolve_attack(attacker_power: i32, defender_defense: i32) -> i32 {
    (attacker_power - defender_defense).max(0)
}

/// Health after healing, clamped to the maximum.
///
/// # Examples
///
/// ```
/// use delve::resolve_heal;
///
/// assert_eq!(resolve_heal(90, 30, 100), 100);
/// assert_eq!(resolve_heal(40, 30, 100), 70);
/// ```
pub fn resolve_heal(current_health: i32, amount: i32, max_health: i32) -> i32 {
    current_health.saturating_add(amount).min(max_health)
}
