use gc_search::*;
use gc_types::cfgdict;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("gridcfg sweep report");

    // Named bases to customize
    let named_defaults = NamedDefaults::new()
        .add_dict("knn", cfgdict! {"K" => 4, "p" => 0.5, "normalizer" => "last"})
        .add_static(
            "pair",
            vec![
                cfgdict! {"K" => 1, "p" => 0.1, "normalizer" => "none"},
                cfgdict! {"K" => 2, "p" => 0.1, "normalizer" => "none"},
            ],
        );

    let cfgstr_list = ["knn", "knn:K=[1,3,5]", "pair:p=[0.2,0.4]", "knn:p=0.9::pair[0]"];
    let options = ParseOptions::new()
        .with_named_defaults(&named_defaults)
        .with_cfgtype("query")
        .with_special_join_dict(cfgdict! {"joined" => true});
    let cfg_combos = parse_cfgstr_list2(&cfgstr_list, &options)?;
    let cfg_list = flatten_cfg_combos(&cfg_combos);
    println!("Expanded {} tokens into {} configs", cfgstr_list.len(), cfg_list.len());

    let labels = get_varied_cfg_lbls(&cfg_list, None, gc_types::CFGNAME_KEY)?;
    for (cfg, lbl) in cfg_list.iter().zip(&labels) {
        println!("  {lbl:<32} <- {}", cfg[gc_types::CFGSTR_KEY]);
    }

    // Strict mode rejects keys the base does not know
    match parse_cfgstr_list2(&["knn:Kay=3"], &options) {
        Ok(_) => println!("unexpected: typo accepted"),
        Err(err) => println!("Rejected typo: {err}"),
    }

    // Parameter metadata seeding a constrained sweep
    let params = ParamInfoList::new(
        "knn",
        vec![
            ParamInfo::new("K", 4).with_varyvals(vec![1, 2, 3, 4]),
            ParamInfo::new("p", 0.5)
                .with_varyvals(vec![0.1, 0.5, 1.0])
                .with_varyslice(IndexSelector::range(0, 3)),
            ParamInfo::flag("sv_on").with_varyvals(vec![true, false]),
        ],
    )
    .with_constraint(|cfg| cfg["K"].as_f64().unwrap_or(0.0) <= 3.0);
    let (sweep_cfgs, sweep_lbls) = params.get_gridsearch_input(&IndexSelector::range(0, 3))?;
    println!("Constrained sweep: {} configs", sweep_cfgs.len());
    for (cfg, lbl) in sweep_cfgs.iter().zip(&sweep_lbls).take(4) {
        println!("  {:<28} [{}]", lbl.replace('\n', " "), params.get_cfg_itemstr(cfg)?);
    }

    // Score a grid and report
    let gridsearch = testdata_grid_search()?;
    let best = gridsearch.get_rank_cfgdict(0, ScoreLabel::ScoreDiff)?;
    println!("Best of {} grid points: {}", gridsearch.len(), ConfigValue::Dict(best));
    println!("{}", gridsearch.get_dimension_stats_str("K", ScoreLabel::ScoreDiff)?);
    println!("{}", gridsearch.get_csv_results(Some(5), ScoreLabel::ScoreDiff)?);

    Ok(())
}
