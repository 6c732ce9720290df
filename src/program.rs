//! Names of the controller programs generated from the irrigation section.
//!
//! A plan covering `days` days gets one program per day and slot, named
//! `"{prefix} Day {day} {slot name}"`. Generated programs are recognized by
//! the prefix alone.

use crate::config::Irrigation;

impl Irrigation {
    /// The program name prefix followed by a space, or nothing if unset.
    pub fn name_prefix(&self) -> String {
        if self.program_name_prefix.is_empty() {
            String::new()
        } else {
            format!("{} ", self.program_name_prefix)
        }
    }

    /// Name of the program for a 1-based day and slot.
    ///
    /// Returns `None` if there is no such slot.
    pub fn program_name(&self, day: usize, slot: usize) -> Option<String> {
        let slot = self.slots.get(slot.checked_sub(1)?)?;
        Some(format!("{}Day {day} {}", self.name_prefix(), slot.name))
    }

    /// Names of all programs of a plan spanning `days` days, day by day.
    pub fn program_names(&self, days: usize) -> Vec<String> {
        (1..=days)
            .flat_map(|day| (1..=self.daily_slots()).map(move |slot| (day, slot)))
            .filter_map(|(day, slot)| self.program_name(day, slot))
            .collect()
    }

    /// Whether a program on the controller was generated with this prefix.
    ///
    /// With an empty prefix every program counts as generated.
    pub fn is_generated(&self, program_name: &str) -> bool {
        program_name.starts_with(&self.name_prefix())
    }
}
