// StrideBeat — Periodic Tasks
//
// One std thread (a FreeRTOS task on target) per periodic activity.  Each
// loop suspends only on its own interval timer or inside a bounded I/O call,
// and exits once the shared `running` flag drops.

pub mod buttons;
pub mod display;
pub mod sensor;
