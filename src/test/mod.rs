mod league_workload;
mod live_updates;
