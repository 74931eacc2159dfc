mod construction;
mod lethe;
