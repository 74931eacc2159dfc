mod dry_run;
mod failures;
mod in_doubt;
mod lethe_commit;
mod per_signer;
mod two_action;
